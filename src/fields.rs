//! Field header detection
//!
//! Recognizes lines naming one or two physical fields and binds each field to
//! the metadata (game duration, game type, year) printed on the line below.

use crate::extractor::{TextLine, Token};
use crate::patterns::{NumberedField, PatternSet};
use crate::pipeline::{DiagnosticKind, ScheduleOptions};
use serde::{Deserialize, Serialize};

/// Which half of the page a block occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// A field column that is active while scanning a page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBlock {
    pub name: String,
    /// X of the header token
    pub start_x: f32,
    pub game_duration: String,
    pub game_type: String,
    /// Default age category for games on this field
    pub year: String,
}

/// The two block slots threaded through a page scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockState {
    pub left: Option<FieldBlock>,
    pub right: Option<FieldBlock>,
}

impl BlockState {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn get(&self, side: Side) -> Option<&FieldBlock> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }
}

/// A field name found on a header line
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCandidate {
    pub name: String,
    pub x: f32,
    pub width: f32,
}

impl FieldCandidate {
    fn from_token(token: &Token) -> Self {
        Self {
            name: token.trimmed().to_string(),
            x: token.x,
            width: token.width,
        }
    }
}

/// A recognized header line
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub left: FieldCandidate,
    pub right: Option<FieldCandidate>,
    /// Candidates beyond the first two, which are not bound
    pub ignored: Vec<String>,
}

/// Check whether `line` names one or two fields.
///
/// With two or more candidates the two leftmost are used. With a single
/// candidate the right field is recovered from the rest of the line: first
/// the paired sub-field ("3A" -> "3B"), then any long enough token clear of
/// the left candidate.
pub fn detect_header(
    line: &TextLine,
    page_width: f32,
    patterns: &PatternSet,
    options: &ScheduleOptions,
) -> Option<HeaderLine> {
    let candidates: Vec<(usize, &Token)> = line
        .tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| patterns.is_field_name(&t.text))
        .collect();

    let (left_idx, left_token) = *candidates.first()?;
    let left = FieldCandidate::from_token(left_token);

    if candidates.len() >= 2 {
        return Some(HeaderLine {
            left,
            right: Some(FieldCandidate::from_token(candidates[1].1)),
            ignored: candidates[2..]
                .iter()
                .map(|(_, t)| t.trimmed().to_string())
                .collect(),
        });
    }

    let others = line
        .tokens
        .iter()
        .enumerate()
        .filter(|&(i, t)| i != left_idx && t.x > left.x)
        .map(|(_, t)| t);

    let right = find_partner_field(&left, others.clone())
        .or_else(|| find_free_right_field(&left, others, page_width, options));

    Some(HeaderLine {
        left,
        right,
        ignored: Vec::new(),
    })
}

/// Adjacent sub-fields are often merged into one visual run, leaving only
/// the partner letter as a separate token: a bare "B", or a run containing
/// "3B" such as "3B hiekka".
fn find_partner_field<'a>(
    left: &FieldCandidate,
    mut tokens: impl Iterator<Item = &'a Token>,
) -> Option<FieldCandidate> {
    let field = NumberedField::parse(&left.name)?;
    let partner = field.partner_letter()?;
    let suffix = format!("{}{}", field.number, partner);

    tokens
        .find(|t| {
            let text = t.trimmed().to_uppercase();
            text == partner.to_string() || text.contains(&suffix)
        })
        .map(|t| FieldCandidate {
            name: field.with_letter(partner),
            x: t.x,
            width: t.width,
        })
}

fn find_free_right_field<'a>(
    left: &FieldCandidate,
    mut tokens: impl Iterator<Item = &'a Token>,
    page_width: f32,
    options: &ScheduleOptions,
) -> Option<FieldCandidate> {
    let gap = if page_width > options.landscape_width {
        options.landscape_right_gap
    } else {
        options.portrait_right_gap
    };
    let min_x = left.x + left.width + gap;

    tokens
        .find(|t| t.x > min_x && t.trimmed().chars().count() > options.min_right_name_len)
        .map(FieldCandidate::from_token)
}

/// Bind a header to its metadata line and build the new block state.
///
/// Left metadata is every token left of `midpoint`; right metadata is every
/// token at or beyond the right field's x. The first three tokens of each
/// side are duration, game type and year. A side with fewer than
/// `min_metadata_tokens` tokens stays empty.
pub fn bind_metadata(
    header: &HeaderLine,
    metadata: Option<&TextLine>,
    midpoint: f32,
    options: &ScheduleOptions,
) -> (BlockState, Vec<DiagnosticKind>) {
    let mut diagnostics = Vec::new();

    if !header.ignored.is_empty() {
        diagnostics.push(DiagnosticKind::ExtraFieldCandidates {
            count: header.ignored.len() + 2,
            ignored: header.ignored.clone(),
        });
    }

    let Some(metadata) = metadata else {
        diagnostics.push(DiagnosticKind::MissingMetadataLine {
            field: header.left.name.clone(),
        });
        return (BlockState::default(), diagnostics);
    };

    let left_meta: Vec<&str> = metadata
        .tokens
        .iter()
        .filter(|t| t.x < midpoint)
        .map(Token::trimmed)
        .collect();
    let left = build_block(Side::Left, &header.left, &left_meta, options, &mut diagnostics);

    let right = header.right.as_ref().and_then(|candidate| {
        let right_meta: Vec<&str> = metadata
            .tokens
            .iter()
            .filter(|t| t.x >= candidate.x)
            .map(Token::trimmed)
            .collect();
        build_block(Side::Right, candidate, &right_meta, options, &mut diagnostics)
    });

    (BlockState { left, right }, diagnostics)
}

fn build_block(
    side: Side,
    candidate: &FieldCandidate,
    meta: &[&str],
    options: &ScheduleOptions,
    diagnostics: &mut Vec<DiagnosticKind>,
) -> Option<FieldBlock> {
    if meta.len() < options.min_metadata_tokens {
        diagnostics.push(DiagnosticKind::IncompleteMetadata {
            side,
            field: candidate.name.clone(),
            found: meta.len(),
        });
        return None;
    }

    let value = |i: usize| meta.get(i).map(|s| s.to_string()).unwrap_or_default();
    Some(FieldBlock {
        name: candidate.name.clone(),
        start_x: candidate.x,
        game_duration: value(0),
        game_type: value(1),
        year: value(2),
    })
}
