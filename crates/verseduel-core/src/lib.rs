//! VerseDuel core: turn-based collaborative poem duels.
//!
//! Two poet agents alternate lines over a shared grounding context, then a
//! judge scores both poems against a fixed rubric. This crate owns the
//! session state machine, the agents, the tolerant report parser, and the
//! retrieval seam; backends for generation and vector lookup plug in behind
//! the `LanguageModel` and `Retriever` traits.

mod agents;
mod config;
mod duel;
mod error;
mod export;
mod metrics;
mod model;
mod offline;
mod report;
mod retrieval;
mod session;
mod stats;
mod telemetry;
mod trace;

pub use agents::{JudgeAgent, PoetAgent};
pub use config::{
    Config, ConfigLoader, LoggingConfig, RetrievalConfig, RubricConfig, SessionConfig,
};
pub use duel::{DuelOutcome, DuelRunner};
pub use error::VerseDuelError;
pub use export::{
    OutcomeArtifacts, SessionRecord, append_session_record, render_poems_text,
    write_outcome_artifacts,
};
pub use metrics::init_metrics_from_env;
pub use model::{DynLanguageModel, LanguageModel, RecordedPrompt, ScriptedModel};
pub use offline::{OfflineJudgeModel, OfflineVerseModel};
pub use report::{ScoreField, ScoreReport, parse_score_report, winner_side};
pub use retrieval::{
    DynRetriever, IngestDocument, MemoryRetriever, RetrievedSnippet, Retriever, chunk_text,
};
pub use session::{DuelSession, Phase, Role};
pub use stats::{BatchMetrics, DuelLedger};
pub use telemetry::init_telemetry;
pub use trace::{TraceCollector, TraceEvent, TraceStep, TraceSummary, persist_trace};
