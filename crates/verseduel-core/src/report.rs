//! Score report parsing.
//!
//! Judges answer in free text. The parser never fails: anything it cannot
//! extract keeps its default and is recorded in `defaulted`, so callers can
//! distinguish a judged 0 from an unparseable report.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::Role;

const WINNER_MARKER: &str = "WINNER:";
const TOTAL_MARKER: &str = "TOTAL:";

/// Fields of a `ScoreReport` that can degrade to their default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    ScoreA,
    ScoreB,
    Winner,
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreField::ScoreA => "score_a",
            ScoreField::ScoreB => "score_b",
            ScoreField::Winner => "winner",
        };
        write!(f, "{label}")
    }
}

/// Structured result of a judge call.
///
/// `raw_text` is always the verbatim judge output; the numeric fields are
/// best-effort extractions. A score of 0 with the matching entry in
/// `defaulted` means "not found", while 0 without it means the judge wrote
/// `0/100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score_a: u8,
    pub score_b: u8,
    pub winner: Option<String>,
    pub raw_text: String,
    pub defaulted: Vec<ScoreField>,
}

impl ScoreReport {
    /// True when at least one field kept its default.
    pub fn is_degraded(&self) -> bool {
        !self.defaulted.is_empty()
    }

    /// Map the free-text winner onto a role, tolerant of bracketing,
    /// emphasis and case. Ambiguous text (both poems named) maps to `None`.
    pub fn winner_role(&self) -> Option<Role> {
        winner_side(self.winner.as_deref())
    }
}

/// Normalise free-text winner declarations onto a role.
pub fn winner_side(text: Option<&str>) -> Option<Role> {
    let normalized = text?
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '*' | '"'))
        .trim()
        .to_uppercase();
    let names_a = normalized.contains("POEM A");
    let names_b = normalized.contains("POEM B");
    match (names_a, names_b) {
        (true, false) => Some(Role::A),
        (false, true) => Some(Role::B),
        (true, true) => None,
        (false, false) => match normalized.as_str() {
            "A" => Some(Role::A),
            "B" => Some(Role::B),
            _ => None,
        },
    }
}

/// Parse a judge's free-text report into a `ScoreReport`. Never fails.
///
/// Lines are scanned in order. A line containing `WINNER:` sets the winner
/// to the trimmed remainder (later lines overwrite; a line carrying both
/// markers counts only as a winner line). Otherwise a line containing
/// `TOTAL:` is a total occurrence: the first fills `score_a`, the second
/// `score_b`, further occurrences are ignored. A total extracts as the text
/// between the marker and a required `/`, parsed as an integer in 0..=100;
/// any violation is swallowed and the slot keeps its default. The first
/// total is A by position, whatever labels surround it. Markers are
/// case-sensitive.
pub fn parse_score_report(raw: &str) -> ScoreReport {
    let mut score_a: Option<u8> = None;
    let mut score_b: Option<u8> = None;
    let mut winner: Option<String> = None;
    let mut totals_seen = 0usize;

    for line in raw.lines() {
        if let Some((_, rest)) = line.split_once(WINNER_MARKER) {
            let text = rest.trim();
            if !text.is_empty() {
                winner = Some(text.to_string());
            }
        } else if line.contains(TOTAL_MARKER) {
            match totals_seen {
                0 => score_a = extract_total(line),
                1 => score_b = extract_total(line),
                _ => tracing::debug!(line, "ignoring extra total line in judge report"),
            }
            totals_seen += 1;
        }
    }

    let mut defaulted = Vec::new();
    if score_a.is_none() {
        defaulted.push(ScoreField::ScoreA);
    }
    if score_b.is_none() {
        defaulted.push(ScoreField::ScoreB);
    }
    if winner.is_none() {
        defaulted.push(ScoreField::Winner);
    }
    if !defaulted.is_empty() {
        tracing::debug!(fields = ?defaulted, "judge report fields kept defaults");
    }

    ScoreReport {
        score_a: score_a.unwrap_or(0),
        score_b: score_b.unwrap_or(0),
        winner,
        raw_text: raw.to_string(),
        defaulted,
    }
}

fn extract_total(line: &str) -> Option<u8> {
    let (_, rest) = line.split_once(TOTAL_MARKER)?;
    let (value, _) = rest.split_once('/')?;
    value.trim().parse::<u8>().ok().filter(|v| *v <= 100)
}
