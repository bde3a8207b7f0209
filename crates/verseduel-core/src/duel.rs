//! Duel orchestration.
//!
//! `DuelRunner` drives one session end to end: alternating poet turns under
//! a per-turn timeout, a single judge call under its own timeout, then the
//! tolerant parse. Failures abort the run with the failing role, turn and
//! stage attached; the runner never invents lines or scores.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::agents::{JudgeAgent, PoetAgent};
use crate::config::Config;
use crate::error::VerseDuelError;
use crate::metrics::record_session_metrics;
use crate::model::DynLanguageModel;
use crate::offline::{OfflineJudgeModel, OfflineVerseModel};
use crate::report::{parse_score_report, ScoreReport};
use crate::retrieval::DynRetriever;
use crate::session::{DuelSession, Role};
use crate::trace::{TraceCollector, TraceEvent};

/// Result of a completed duel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelOutcome {
    pub session_id: String,
    pub context: String,
    pub lines_a: Vec<String>,
    pub lines_b: Vec<String>,
    pub report: ScoreReport,
    pub trace: Vec<TraceEvent>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl DuelOutcome {
    pub fn winner_role(&self) -> Option<Role> {
        self.report.winner_role()
    }
}

/// Drives duel sessions over a fixed pair of poets and one judge.
pub struct DuelRunner {
    poet_a: PoetAgent,
    poet_b: PoetAgent,
    judge: JudgeAgent,
    turn_timeout: Duration,
    scoring_timeout: Duration,
}

impl DuelRunner {
    pub fn new(
        model_a: DynLanguageModel,
        model_b: DynLanguageModel,
        judge_model: DynLanguageModel,
        retriever: DynRetriever,
        config: &Config,
    ) -> Self {
        let poet_a = PoetAgent::new(
            Role::A,
            model_a,
            retriever.clone(),
            config.retrieval.verse_snippets,
        );
        let poet_b = PoetAgent::new(
            Role::B,
            model_b,
            retriever.clone(),
            config.retrieval.verse_snippets,
        );
        let judge = JudgeAgent::new(
            judge_model,
            retriever,
            config.rubric.clone(),
            config.retrieval.judge_snippets,
        );
        Self {
            poet_a,
            poet_b,
            judge,
            turn_timeout: Duration::from_millis(config.session.turn_timeout_ms),
            scoring_timeout: Duration::from_millis(config.session.scoring_timeout_ms),
        }
    }

    /// Runner backed by the deterministic offline models; no credentials
    /// needed.
    pub fn offline(retriever: DynRetriever, config: &Config) -> Self {
        Self::new(
            Arc::new(OfflineVerseModel),
            Arc::new(OfflineVerseModel),
            Arc::new(OfflineJudgeModel),
            retriever,
            config,
        )
    }

    /// Run one duel over `context` with a shared `target_turns` budget.
    #[instrument(name = "duel.run", skip(self, context))]
    pub async fn run(
        &self,
        context: &str,
        target_turns: i32,
    ) -> Result<DuelOutcome, VerseDuelError> {
        let started = Instant::now();
        let result = self.run_session(context, target_turns, started).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                record_session_metrics("completed", duration_ms, outcome.report.is_degraded());
            }
            Err(err) => {
                warn!(error = %err, duration_ms, "duel aborted");
                record_session_metrics(failure_status(err), duration_ms, false);
            }
        }
        result
    }

    async fn run_session(
        &self,
        context: &str,
        target_turns: i32,
        started: Instant,
    ) -> Result<DuelOutcome, VerseDuelError> {
        let session_id = Uuid::new_v4().to_string();
        let mut session = DuelSession::new(context, target_turns);
        let mut trace = TraceCollector::new();
        info!(%session_id, target_turns, "duel started");

        while let Some(role) = session.next_role() {
            let turn = session.turns_taken() + 1;
            let poet = match role {
                Role::A => &self.poet_a,
                Role::B => &self.poet_b,
            };
            let history = session.history();

            let verse = match timeout(
                self.turn_timeout,
                poet.generate_verse(session.context(), &history),
            )
            .await
            {
                Ok(Ok(verse)) => verse,
                Ok(Err(err)) => return Err(VerseDuelError::generation(role, turn, err)),
                Err(_) => {
                    return Err(VerseDuelError::generation(
                        role,
                        turn,
                        anyhow!("turn timed out after {:?}", self.turn_timeout),
                    ));
                }
            };
            if verse.is_empty() {
                return Err(VerseDuelError::generation(
                    role,
                    turn,
                    anyhow!("poet returned an empty line"),
                ));
            }

            debug!(%session_id, turn, role = role.slug(), chars = verse.len(), "line recorded");
            trace.record(
                format!("turn.{turn}.{}", role.slug()),
                format!("line recorded ({} chars)", verse.len()),
            );
            session.record_line(role, verse)?;
        }

        debug!(%session_id, turns = session.turns_taken(), "generation finished, scoring");
        let raw = match timeout(
            self.scoring_timeout,
            self.judge
                .score(session.lines_a(), session.lines_b(), session.context()),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(VerseDuelError::scoring(anyhow!(
                    "scoring timed out after {:?}",
                    self.scoring_timeout
                )));
            }
        };
        trace.record("scoring", format!("judge report captured ({} chars)", raw.len()));

        let report = parse_score_report(&raw);
        if report.is_degraded() {
            warn!(%session_id, defaulted = ?report.defaulted, "judge report parsed with defaults");
            trace.record("parse", format!("{} field(s) kept defaults", report.defaulted.len()));
        } else {
            trace.record("parse", "all fields extracted");
        }
        session.complete_scoring(report.clone())?;

        info!(
            %session_id,
            score_a = report.score_a,
            score_b = report.score_b,
            winner = report.winner.as_deref().unwrap_or("undecided"),
            duration_ms = started.elapsed().as_millis() as u64,
            "duel complete"
        );

        let (lines_a, lines_b, _) = session.into_parts();
        Ok(DuelOutcome {
            session_id,
            context: context.to_string(),
            lines_a,
            lines_b,
            report,
            trace: trace.into_events(),
            duration_ms: started.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
        })
    }

    /// Run many independent duels concurrently over a shared retriever.
    /// Results come back in input order, one per context.
    pub async fn run_batch(
        self: Arc<Self>,
        contexts: Vec<String>,
        target_turns: i32,
        concurrency: usize,
    ) -> Vec<Result<DuelOutcome, VerseDuelError>> {
        let total = contexts.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (index, context) in contexts.into_iter().enumerate() {
            let runner = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            Err(VerseDuelError::Other(anyhow!(
                                "batch semaphore closed unexpectedly"
                            ))),
                        );
                    }
                };
                (index, runner.run(&context, target_turns).await)
            });
        }

        let mut slots: Vec<Option<Result<DuelOutcome, VerseDuelError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => warn!(error = %err, "batch duel task aborted"),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(VerseDuelError::Other(anyhow!("duel task aborted"))))
            })
            .collect()
    }
}

fn failure_status(err: &VerseDuelError) -> &'static str {
    match err {
        VerseDuelError::GenerationFailure { .. } => "generation_failure",
        VerseDuelError::InsufficientContent => "insufficient_content",
        VerseDuelError::ScoringFailure { .. } => "scoring_failure",
        VerseDuelError::TurnOrder { .. } | VerseDuelError::OutOfPhase { .. } => "sequencing",
        VerseDuelError::InvalidConfiguration(_) | VerseDuelError::ConfigIo { .. } => "config",
        VerseDuelError::Other(_) => "other",
    }
}
