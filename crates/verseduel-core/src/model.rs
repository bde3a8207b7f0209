//! Language-generation seam.
//!
//! The duel never talks to a generation service directly; everything goes
//! through `LanguageModel`. Production backends live behind this trait,
//! `offline.rs` provides deterministic ones, and `ScriptedModel` here replays
//! canned outputs for tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// One opaque generation capability: a system instruction plus a user
/// payload in, one unit of text out. May fail or hang; the runner applies
/// timeouts around every call.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

pub type DynLanguageModel = Arc<dyn LanguageModel>;

/// A prompt pair as seen by a `ScriptedModel`.
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub system: String,
    pub user: String,
}

/// Replays a fixed queue of responses and records every prompt it saw.
/// Once the queue is empty it fails, which surfaces as a generation or
/// scoring failure in the runner.
pub struct ScriptedModel {
    responses: Mutex<Vec<String>>,
    transcript: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far, in call order.
    pub async fn transcript(&self) -> Vec<RecordedPrompt> {
        self.transcript.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String> {
        self.transcript.lock().await.push(RecordedPrompt {
            system: system.to_string(),
            user: user.to_string(),
        });
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            anyhow::bail!("scripted model has no responses left");
        }
        Ok(responses.remove(0))
    }
}
