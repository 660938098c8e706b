//! Manual corrections applied after automatic extraction
//!
//! Some schedules carry fields whose layout the detector cannot read. Their
//! games are supplied as a table keyed by field name and merged into the
//! extracted result as the last step.

use crate::rows::{GameRecord, YearSource};
use crate::ScheduleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How override games combine with extracted ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideMode {
    /// Drop every extracted game of the field, keep only the overrides
    #[default]
    Replace,
    /// Add an override only where the field has no game at that time
    FillGaps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideGame {
    pub time: String,
    #[serde(default)]
    pub team1: String,
    #[serde(default)]
    pub team2: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub game_duration: String,
    #[serde(default)]
    pub game_type: String,
}

impl OverrideGame {
    fn to_record(&self, field: &str) -> GameRecord {
        GameRecord {
            field: field.to_string(),
            time: self.time.clone(),
            team1: self.team1.clone(),
            team2: self.team2.clone(),
            year: self.year.clone(),
            game_duration: self.game_duration.clone(),
            game_type: self.game_type.clone(),
            year_source: YearSource::Override,
        }
    }
}

/// Override games per field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideTable {
    #[serde(default)]
    pub mode: OverrideMode,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<OverrideGame>>,
}

impl OverrideTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScheduleError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge the table into `games`; override games are appended in field order
    pub fn apply(&self, mut games: Vec<GameRecord>) -> Vec<GameRecord> {
        match self.mode {
            OverrideMode::Replace => {
                let before = games.len();
                games.retain(|g| !self.fields.contains_key(&g.field));
                if before != games.len() {
                    log::info!("Overrides replaced {} extracted games", before - games.len());
                }
                for (field, overrides) in &self.fields {
                    games.extend(overrides.iter().map(|o| o.to_record(field)));
                }
            }
            OverrideMode::FillGaps => {
                for (field, overrides) in &self.fields {
                    for o in overrides {
                        let taken = games.iter().any(|g| &g.field == field && g.time == o.time);
                        if !taken {
                            games.push(o.to_record(field));
                        }
                    }
                }
            }
        }
        games
    }
}
