//! Result persistence: per-duel artifacts plus the append-only session
//! ledger that `stats` aggregates later.

use std::fmt::Write as _;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duel::DuelOutcome;

const BANNER: &str = "============================================================";
const RULE: &str = "------------------------------------------------------------";

/// One line of the session ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub context: String,
    pub turns: u32,
    pub score_a: u8,
    pub score_b: u8,
    pub winner: Option<String>,
    pub degraded_report: bool,
    pub duration_ms: u64,
}

impl From<&DuelOutcome> for SessionRecord {
    fn from(outcome: &DuelOutcome) -> Self {
        Self {
            session_id: outcome.session_id.clone(),
            timestamp: outcome.completed_at,
            context: outcome.context.clone(),
            turns: (outcome.lines_a.len() + outcome.lines_b.len()) as u32,
            score_a: outcome.report.score_a,
            score_b: outcome.report.score_b,
            winner: outcome.report.winner.clone(),
            degraded_report: outcome.report.is_degraded(),
            duration_ms: outcome.duration_ms,
        }
    }
}

fn records_dir() -> PathBuf {
    std::env::var("VERSEDUEL_RECORDS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/records"))
}

fn todays_file(dir: &Path) -> PathBuf {
    let filename = format!("{}.jsonl", Utc::now().format("%Y-%m-%d"));
    dir.join(filename)
}

/// Append one record to today's ledger file. Ledger problems are logged,
/// never propagated; a duel that ran to completion stays completed.
pub fn append_session_record(outcome: &DuelOutcome) {
    let dir = records_dir();
    if let Err(err) = create_dir_all(&dir) {
        warn!(error = %err, path = %dir.display(), "unable to create records directory");
        return;
    }

    let record = SessionRecord::from(outcome);
    let file_path = todays_file(&dir);
    let mut file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file_path)
    {
        Ok(file) => file,
        Err(err) => {
            warn!(error = %err, path = %file_path.display(), "unable to open records ledger");
            return;
        }
    };

    if let Err(err) = serde_json::to_writer(&mut file, &record) {
        warn!(error = %err, "failed to serialise session record");
        return;
    }
    if let Err(err) = writeln!(file) {
        warn!(error = %err, "failed to append newline to records ledger");
    }
}

/// Paths of the files written for one duel.
#[derive(Debug, Clone)]
pub struct OutcomeArtifacts {
    pub results_json: PathBuf,
    pub poems_text: PathBuf,
}

/// Write the outcome JSON and the rendered poems file under `dir`.
pub fn write_outcome_artifacts(
    dir: impl AsRef<Path>,
    outcome: &DuelOutcome,
) -> Result<OutcomeArtifacts> {
    let dir = dir.as_ref();
    create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let results_json = dir.join("poem_results.json");
    let payload = serde_json::to_vec_pretty(outcome)?;
    std::fs::write(&results_json, payload)
        .with_context(|| format!("failed to write {}", results_json.display()))?;

    let poems_text = dir.join("poems.txt");
    std::fs::write(&poems_text, render_poems_text(outcome))
        .with_context(|| format!("failed to write {}", poems_text.display()))?;

    Ok(OutcomeArtifacts {
        results_json,
        poems_text,
    })
}

/// Human-readable rendering of both poems and the judgment.
pub fn render_poems_text(outcome: &DuelOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "COLLABORATIVE POEM DUEL RESULTS");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Session: {}", outcome.session_id);
    let context_preview: String = outcome.context.chars().take(300).collect();
    let _ = writeln!(out, "Context: {context_preview}");
    let _ = writeln!(out);

    for (label, lines) in [("POEM A", &outcome.lines_a), ("POEM B", &outcome.lines_b)] {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "{label}");
        let _ = writeln!(out, "{RULE}");
        for (i, line) in lines.iter().enumerate() {
            let _ = writeln!(out, "{}. {line}", i + 1);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "JUDGMENT");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "{}", outcome.report.raw_text);
    out
}
