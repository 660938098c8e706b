//! Game schedule reconstruction from positioned PDF text
//!
//! This module provides:
//! - Decoding of the upstream extractor's percent-encoded text runs
//! - Line clustering and field (column) header detection
//! - Game row extraction with age-category inference
//! - Storage of results with replace-all semantics

pub mod extractor;
pub mod fields;
pub mod overrides;
pub mod patterns;
pub mod pipeline;
pub mod rows;
pub mod store;
pub mod year;

pub use extractor::{group_into_lines, RawDocument, RawPage, RawTextRun, TextLine, Token};
pub use fields::{BlockState, FieldBlock, Side};
pub use overrides::{OverrideMode, OverrideTable};
pub use pipeline::{
    run_pipeline, Diagnostic, DiagnosticKind, ExtractionResult, JsonFileSource, LineKind,
    MemorySource, PageSource, ScheduleOptions, ScheduleParser,
};
pub use rows::{GameRecord, YearSource};
pub use store::{GameStore, JsonFileStore, MemoryStore, SqliteStore, StoreError};
pub use year::infer_year;

use std::path::Path;

/// Parse an extracted document from a JSON file
///
/// The file name is attached to the result as its source.
pub fn process_document<P: AsRef<Path>>(
    path: P,
    options: ScheduleOptions,
) -> Result<ExtractionResult, ScheduleError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    process_document_mem(&data, name.as_deref(), options)
}

/// Parse an extracted document from a memory buffer
pub fn process_document_mem(
    buffer: &[u8],
    source_file: Option<&str>,
    options: ScheduleOptions,
) -> Result<ExtractionResult, ScheduleError> {
    let document: RawDocument = serde_json::from_slice(buffer)?;
    ScheduleParser::new(options).parse(&document, source_file)
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document has no pages")]
    NoPages,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
