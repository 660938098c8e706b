//! Game row extraction
//!
//! Splits a data line between the active left and right field blocks and
//! turns each side that starts with a time range into a game record.

use crate::extractor::{TextLine, Token};
use crate::fields::{BlockState, FieldBlock, Side};
use crate::patterns::is_time_range;
use crate::pipeline::DiagnosticKind;
use crate::year::infer_year;
use serde::{Deserialize, Serialize};

/// Where a record's year came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearSource {
    /// Marker found in a team name
    Inferred,
    /// The field block's header metadata
    Header,
    /// An override table entry
    Override,
}

impl YearSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            YearSource::Inferred => "inferred",
            YearSource::Header => "header",
            YearSource::Override => "override",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inferred" => Some(YearSource::Inferred),
            "header" => Some(YearSource::Header),
            "override" => Some(YearSource::Override),
            _ => None,
        }
    }
}

/// One schedule entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub field: String,
    pub time: String,
    /// Empty for an open slot
    pub team1: String,
    pub team2: String,
    pub year: String,
    pub game_duration: String,
    pub game_type: String,
    pub year_source: YearSource,
}

/// Records and diagnostics produced by one data line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowOutcome {
    pub games: Vec<GameRecord>,
    pub diagnostics: Vec<DiagnosticKind>,
}

/// Extract the games on one data line.
///
/// The left block owns tokens in `[left.start_x, midpoint)`, the right block
/// owns everything from `right.start_x` on. When a right field starts left of
/// the midpoint the two domains overlap; a row whose time token lies in that
/// overlap belongs to the right block and is not emitted for the left.
pub fn extract_rows(line: &TextLine, state: &BlockState, midpoint: f32) -> RowOutcome {
    let mut outcome = RowOutcome::default();

    if line.is_empty() {
        return outcome;
    }

    if state.is_empty() {
        outcome.diagnostics.push(DiagnosticKind::OrphanedLine { text: line.text() });
        return outcome;
    }

    let left = state.left.as_ref().and_then(|block| {
        let tokens = tokens_in(line, block.start_x, midpoint);
        parse_row(&tokens, block)
    });

    let right = state.right.as_ref().and_then(|block| {
        let tokens = tokens_in(line, block.start_x, f32::INFINITY);
        parse_row(&tokens, block)
    });

    if let Some((game, time_x)) = left {
        let misplaced = state.right.as_ref().is_some_and(|r| time_x >= r.start_x);
        if misplaced {
            log::debug!(
                "Row {} {:?} sits in the right field's columns, left copy skipped",
                game.time,
                game.team1
            );
        } else {
            outcome.games.push(game);
        }
    }

    if let Some((game, _)) = right {
        outcome.games.push(game);
    }

    for side in [Side::Left, Side::Right] {
        if state.get(side).is_none() {
            if let Some(time) = unclaimed_time(line, side, midpoint) {
                outcome.diagnostics.push(DiagnosticKind::DroppedRow { side, time });
            }
        }
    }

    outcome
}

fn tokens_in(line: &TextLine, from: f32, to: f32) -> Vec<&Token> {
    line.tokens
        .iter()
        .filter(|t| t.x >= from && t.x < to)
        .collect()
}

/// Time text of a row on a side that has no active block
fn unclaimed_time(line: &TextLine, side: Side, midpoint: f32) -> Option<String> {
    let first = match side {
        Side::Left => line.tokens.iter().find(|t| t.x < midpoint),
        Side::Right => line.tokens.iter().find(|t| t.x >= midpoint),
    }?;
    let time = first.trimmed();
    is_time_range(time).then(|| time.to_string())
}

/// Build a record from one side's tokens; also returns the time token's x
fn parse_row(tokens: &[&Token], block: &FieldBlock) -> Option<(GameRecord, f32)> {
    let first = tokens.first()?;
    let time = first.trimmed();
    if !is_time_range(time) {
        return None;
    }

    // A second time token is a stray duplicate, not a team
    let team = |i: usize| -> String {
        tokens
            .get(i)
            .map(|t| t.trimmed())
            .filter(|text| !is_time_range(text))
            .unwrap_or_default()
            .to_string()
    };
    let team1 = team(1);
    let team2 = team(2);

    let (year, year_source) = match infer_year(&team1, &team2) {
        Some(year) => (year, YearSource::Inferred),
        None => (block.year.clone(), YearSource::Header),
    };

    let game = GameRecord {
        field: block.name.clone(),
        time: time.to_string(),
        team1,
        team2,
        year,
        game_duration: block.game_duration.clone(),
        game_type: block.game_type.clone(),
        year_source,
    };

    Some((game, first.x))
}
