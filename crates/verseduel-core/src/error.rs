use std::path::PathBuf;

use thiserror::Error;

use crate::session::{Phase, Role};

/// Core error type for VerseDuel.
///
/// Generation and scoring failures are fatal for the session that raised
/// them: the runner aborts without retrying and without substituting
/// placeholder lines or scores. Parse degradation is deliberately absent
/// here; a malformed judge report still yields a `ScoreReport` with
/// defaulted fields.
#[derive(Debug, Error)]
pub enum VerseDuelError {
    /// A poet call failed, timed out, or produced an empty line.
    /// `turn` is the 1-based index of the failing turn.
    #[error("{role} failed on turn {turn}: {source}")]
    GenerationFailure {
        role: Role,
        turn: u32,
        #[source]
        source: anyhow::Error,
    },
    /// Scoring was attempted with at least one empty line sequence.
    #[error("scoring requires at least one line from each poet")]
    InsufficientContent,
    /// The judge call failed, timed out, or returned empty output.
    #[error("scoring failed: {source}")]
    ScoringFailure {
        #[source]
        source: anyhow::Error,
    },
    /// A line was recorded for a role out of its turn.
    #[error("turn order violation: expected {expected:?}, got {got}")]
    TurnOrder { expected: Option<Role>, got: Role },
    /// A session operation was invoked in the wrong phase.
    #[error("operation not permitted in phase {phase}")]
    OutOfPhase { phase: Phase },
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VerseDuelError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn generation(role: Role, turn: u32, source: anyhow::Error) -> Self {
        Self::GenerationFailure { role, turn, source }
    }

    pub fn scoring(source: anyhow::Error) -> Self {
        Self::ScoringFailure { source }
    }
}
