//! Age-category inference from team names

use crate::patterns::find_year_marker;

/// Derive an age cohort from the two team names.
///
/// Team 1 is scanned before team 2; within a name the leftmost marker wins.
/// Returns `None` when neither name carries a marker, in which case the
/// caller falls back to the field header's year.
pub fn infer_year(team1: &str, team2: &str) -> Option<String> {
    [team1, team2]
        .iter()
        .map(|team| team.trim())
        .filter(|team| !team.is_empty())
        .find_map(find_year_marker)
        .map(str::to_string)
}
