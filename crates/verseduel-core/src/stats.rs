use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::export::SessionRecord;
use crate::report::winner_side;
use crate::session::Role;

/// Aggregated view of a ledger file.
#[derive(Debug, Default, Clone)]
pub struct BatchMetrics {
    pub total_sessions: usize,
    pub wins_a: usize,
    pub wins_b: usize,
    pub undecided: usize,
    pub average_score_a: f32,
    pub average_score_b: f32,
    pub degraded_sessions: Vec<String>,
}

impl BatchMetrics {
    pub fn record(&mut self, record: &SessionRecord) {
        self.total_sessions += 1;
        let n = self.total_sessions as f32;
        self.average_score_a =
            (self.average_score_a * (n - 1.0) + record.score_a as f32) / n;
        self.average_score_b =
            (self.average_score_b * (n - 1.0) + record.score_b as f32) / n;

        match winner_side(record.winner.as_deref()) {
            Some(Role::A) => self.wins_a += 1,
            Some(Role::B) => self.wins_b += 1,
            None => self.undecided += 1,
        }
        if record.degraded_report {
            self.degraded_sessions.push(record.session_id.clone());
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} session(s) • A {} win(s) avg {:.1} • B {} win(s) avg {:.1} • {} undecided • {} degraded report(s)",
            self.total_sessions,
            self.wins_a,
            self.average_score_a,
            self.wins_b,
            self.average_score_b,
            self.undecided,
            self.degraded_sessions.len()
        )
    }
}

/// Reads session ledgers back for aggregate reporting.
pub struct DuelLedger;

impl DuelLedger {
    /// Aggregate one JSONL ledger file. Malformed lines are skipped with a
    /// debug log, matching how they were written: best effort, never fatal.
    pub fn analyze(path: impl AsRef<Path>) -> Result<BatchMetrics> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("failed to open ledger {}", path.as_ref().display()))?;
        let mut metrics = BatchMetrics::default();

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionRecord>(&line) {
                Ok(record) => metrics.record(&record),
                Err(err) => {
                    tracing::debug!(%err, "skipping malformed ledger line");
                }
            }
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;
    use tempfile::NamedTempFile;

    use super::*;

    fn record(id: &str, score_a: u8, score_b: u8, winner: Option<&str>, degraded: bool) -> String {
        serde_json::to_string(&SessionRecord {
            session_id: id.to_string(),
            timestamp: Utc::now(),
            context: "ctx".into(),
            turns: 4,
            score_a,
            score_b,
            winner: winner.map(str::to_string),
            degraded_report: degraded,
            duration_ms: 900,
        })
        .unwrap()
    }

    #[test]
    fn ledger_aggregates_wins_and_averages() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", record("one", 80, 70, Some("Poem A"), false)).unwrap();
        writeln!(file, "{}", record("two", 60, 90, Some("[Poem B]"), false)).unwrap();
        writeln!(file, "{}", record("three", 0, 0, None, true)).unwrap();

        let metrics = DuelLedger::analyze(file.path()).unwrap();
        assert_eq!(metrics.total_sessions, 3);
        assert_eq!(metrics.wins_a, 1);
        assert_eq!(metrics.wins_b, 1);
        assert_eq!(metrics.undecided, 1);
        assert!((metrics.average_score_a - 46.666_668).abs() < 0.001);
        assert!((metrics.average_score_b - 53.333_332).abs() < 0.001);
        assert_eq!(metrics.degraded_sessions, vec!["three".to_string()]);
    }

    #[test]
    fn malformed_and_blank_lines_are_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", record("one", 80, 70, Some("Poem A"), false)).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file, "{}", record("two", 50, 50, None, false)).unwrap();

        let metrics = DuelLedger::analyze(file.path()).unwrap();
        assert_eq!(metrics.total_sessions, 2);
        assert_eq!(metrics.undecided, 1);
    }

    #[test]
    fn summary_mentions_every_tally() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", record("one", 80, 70, Some("Poem A"), true)).unwrap();

        let metrics = DuelLedger::analyze(file.path()).unwrap();
        let summary = metrics.summary();
        assert!(summary.contains("1 session(s)"));
        assert!(summary.contains("A 1 win(s)"));
        assert!(summary.contains("1 degraded report(s)"));
    }
}
