//! Page and document orchestration
//!
//! Drives the line scan for each page, collects game records and diagnostics,
//! finds the document date and hands finished results to a [`GameStore`].

use crate::extractor::{decode_page, group_into_lines, RawDocument, RawPage, TextLine};
use crate::fields::{bind_metadata, detect_header, BlockState, Side};
use crate::overrides::OverrideTable;
use crate::patterns::{find_date, PatternSet};
use crate::rows::{extract_rows, GameRecord};
use crate::store::GameStore;
use crate::ScheduleError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tunable layout thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// Vertical tolerance for grouping tokens into one line (default: 0.15)
    pub y_tolerance: f32,
    /// Pages wider than this are landscape (default: 100.0)
    pub landscape_width: f32,
    /// Right-field search gap on landscape pages (default: 0.5)
    pub landscape_right_gap: f32,
    /// Right-field search gap on portrait pages (default: 0.2)
    pub portrait_right_gap: f32,
    /// A free right-field token must be longer than this (default: 3)
    pub min_right_name_len: usize,
    /// Metadata tokens needed to open a block (default: 3)
    pub min_metadata_tokens: usize,
    /// Extra ground names recognized as field headers
    pub known_grounds: Vec<String>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 0.15,
            landscape_width: 100.0,
            landscape_right_gap: 0.5,
            portrait_right_gap: 0.2,
            min_right_name_len: 3,
            min_metadata_tokens: 3,
            known_grounds: Vec::new(),
        }
    }
}

impl ScheduleOptions {
    /// Load options from a JSON file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScheduleError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// A recovered layout problem
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// Percent-decoding failed and the raw text was kept
    DecodeFallback { raw: String },
    /// A header named more than two fields
    ExtraFieldCandidates { count: usize, ignored: Vec<String> },
    /// A header was the last line of its page
    MissingMetadataLine { field: String },
    /// Too few metadata tokens; the side stays empty
    IncompleteMetadata {
        side: Side,
        field: String,
        found: usize,
    },
    /// Text with no active block to attribute it to
    OrphanedLine { text: String },
    /// A game row on a side whose block is empty
    DroppedRow { side: Side, time: String },
}

/// A diagnostic with its location (1-indexed page, 0-indexed line)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub page: usize,
    pub line: Option<usize>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

/// Everything extracted from one document
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub document_date: Option<String>,
    pub games: Vec<GameRecord>,
    pub source_file: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// How the scan treated a line
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Field header; holds the block state it opened
    Header(BlockState),
    /// Metadata line consumed by the header above it
    Metadata,
    /// Data line and the number of games taken from it
    Data { games: usize },
}

/// Games and diagnostics of a single page
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub games: Vec<GameRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub lines: Vec<TextLine>,
    /// One entry per line in `lines`
    pub kinds: Vec<LineKind>,
}

/// Schedule layout parser
#[derive(Debug, Clone)]
pub struct ScheduleParser {
    options: ScheduleOptions,
    patterns: PatternSet,
    overrides: Option<OverrideTable>,
}

impl Default for ScheduleParser {
    fn default() -> Self {
        Self::new(ScheduleOptions::default())
    }
}

impl ScheduleParser {
    pub fn new(options: ScheduleOptions) -> Self {
        let patterns = PatternSet::new(&options.known_grounds);
        Self {
            options,
            patterns,
            overrides: None,
        }
    }

    /// Apply `table` after automatic extraction
    pub fn with_overrides(mut self, table: OverrideTable) -> Self {
        self.overrides = Some(table);
        self
    }

    /// Parse every page of `document`, in order
    pub fn parse(
        &self,
        document: &RawDocument,
        source_file: Option<&str>,
    ) -> Result<ExtractionResult, ScheduleError> {
        if document.pages.is_empty() {
            return Err(ScheduleError::NoPages);
        }

        let mut result = ExtractionResult {
            source_file: source_file.map(str::to_string),
            ..Default::default()
        };

        for (index, page) in document.pages.iter().enumerate() {
            let page_result = self.parse_page(index + 1, page);

            if index == 0 {
                result.document_date = find_document_date(&page_result.lines);
            }

            result.games.extend(page_result.games);
            result.diagnostics.extend(page_result.diagnostics);
        }

        if let Some(overrides) = &self.overrides {
            result.games = overrides.apply(std::mem::take(&mut result.games));
        }

        log::info!(
            "Extracted {} games from {} pages ({} diagnostics, date {:?})",
            result.games.len(),
            document.pages.len(),
            result.diagnostics.len(),
            result.document_date
        );

        Ok(result)
    }

    /// Scan one page. `page_number` is 1-indexed and only used for diagnostics.
    pub fn parse_page(&self, page_number: usize, page: &RawPage) -> PageResult {
        let mut result = PageResult::default();

        let (tokens, fallbacks) = decode_page(page);
        for raw in fallbacks {
            result.diagnostics.push(Diagnostic {
                page: page_number,
                line: None,
                kind: DiagnosticKind::DecodeFallback { raw },
            });
        }

        let lines = group_into_lines(tokens, self.options.y_tolerance);
        let midpoint = page.width / 2.0;
        let mut state = BlockState::default();
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];

            if let Some(header) = detect_header(line, page.width, &self.patterns, &self.options) {
                log::debug!("page {} line {}: header {:?}", page_number, i, line.text());
                let (next, kinds) =
                    bind_metadata(&header, lines.get(i + 1), midpoint, &self.options);
                push_diagnostics(&mut result.diagnostics, page_number, i, kinds);
                result.kinds.push(LineKind::Header(next.clone()));
                if i + 1 < lines.len() {
                    result.kinds.push(LineKind::Metadata);
                }
                state = next;
                i += 2;
                continue;
            }

            let outcome = extract_rows(line, &state, midpoint);
            log::debug!(
                "page {} line {}: {} games from {:?}",
                page_number,
                i,
                outcome.games.len(),
                line.text()
            );
            result.kinds.push(LineKind::Data {
                games: outcome.games.len(),
            });
            result.games.extend(outcome.games);
            push_diagnostics(&mut result.diagnostics, page_number, i, outcome.diagnostics);
            i += 1;
        }

        result.lines = lines;
        result
    }
}

fn push_diagnostics(
    diagnostics: &mut Vec<Diagnostic>,
    page: usize,
    line: usize,
    kinds: Vec<DiagnosticKind>,
) {
    for kind in kinds {
        log::warn!("page {} line {}: {:?}", page, line, kind);
        diagnostics.push(Diagnostic {
            page,
            line: Some(line),
            kind,
        });
    }
}

/// First `D.M.YYYY` date on the page, scanning lines top to bottom
pub fn find_document_date(lines: &[TextLine]) -> Option<String> {
    lines
        .iter()
        .flat_map(|line| line.tokens.iter())
        .find_map(|token| find_date(&token.text))
        .map(str::to_string)
}

/// Where documents come from
pub trait PageSource {
    /// Name recorded with the run, usually the input file name
    fn name(&self) -> Option<String>;

    fn load(&self) -> Result<RawDocument, ScheduleError>;
}

/// A JSON document written by the upstream extractor
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl PageSource for JsonFileSource {
    fn name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    fn load(&self) -> Result<RawDocument, ScheduleError> {
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// An already loaded document
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub name: Option<String>,
    pub document: RawDocument,
}

impl PageSource for MemorySource {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn load(&self) -> Result<RawDocument, ScheduleError> {
        Ok(self.document.clone())
    }
}

/// Parse one document and replace the store's contents with its games.
///
/// Every invocation records a run. A document that cannot be loaded or has no
/// pages marks the run failed; so does a store write error, in which case the
/// previous game set is left in place.
pub fn run_pipeline(
    source: &dyn PageSource,
    parser: &ScheduleParser,
    store: &mut dyn GameStore,
) -> Result<ExtractionResult, ScheduleError> {
    let name = source.name();
    let filename = name.as_deref().unwrap_or("<unknown>");

    let parsed = source
        .load()
        .and_then(|document| parser.parse(&document, name.as_deref()));

    let result = match parsed {
        Ok(result) => result,
        Err(e) => {
            log::error!("Failed to parse {}: {}", filename, e);
            let run = store.record_run(filename, None)?;
            store.mark_run_failed(run, &e.to_string())?;
            return Err(e);
        }
    };

    let run = store.record_run(filename, result.document_date.as_deref())?;

    if let Err(e) = store.replace_all(&result.games) {
        log::error!("Failed to store games for {}: {}", filename, e);
        store.mark_run_failed(run, &e.to_string())?;
        return Err(e.into());
    }

    store.mark_run_completed(run, result.games.len())?;
    log::info!("Stored {} games from {} (run {})", result.games.len(), filename, run);

    Ok(result)
}
