//! Poet and judge agents.
//!
//! Agents own their prompt construction and their retrieval calls; they do
//! not touch session state. The runner validates what they return.

use anyhow::anyhow;
use tracing::{debug, instrument};

use crate::config::RubricConfig;
use crate::error::VerseDuelError;
use crate::model::DynLanguageModel;
use crate::retrieval::DynRetriever;
use crate::session::Role;

const FIRST_LINE_FALLBACK: &str = "This is the first line.";

/// One of the two competing verse generators.
pub struct PoetAgent {
    role: Role,
    model: DynLanguageModel,
    retriever: DynRetriever,
    snippet_cap: usize,
}

impl PoetAgent {
    pub fn new(
        role: Role,
        model: DynLanguageModel,
        retriever: DynRetriever,
        snippet_cap: usize,
    ) -> Self {
        Self {
            role,
            model,
            retriever,
            snippet_cap,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Produce the next line given the session context and the chronological
    /// history of both poets' lines. Retrieves up to `snippet_cap` grounding
    /// snippets with the context as the query. Returns the line trimmed;
    /// whether an empty line is acceptable is the caller's call.
    #[instrument(name = "agent.verse", skip(self, context, history), fields(role = %self.role))]
    pub async fn generate_verse(
        &self,
        context: &str,
        history: &[String],
    ) -> anyhow::Result<String> {
        let snippets = self.retriever.retrieve(context, self.snippet_cap).await?;
        let facts = snippets
            .iter()
            .map(|snippet| snippet.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let conversation = if history.is_empty() {
            FIRST_LINE_FALLBACK.to_string()
        } else {
            history
                .iter()
                .enumerate()
                .map(|(i, verse)| format!("Line {}: {verse}", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        };

        debug!(
            snippets = snippets.len(),
            history_lines = history.len(),
            "building verse prompt"
        );

        let system = format!(
            "You are a talented poet. Create ONE poetic line that:\n\
             1. Is factually grounded in the provided context\n\
             2. Flows naturally with previous lines (if any)\n\
             3. Uses vivid imagery and literary devices\n\
             4. Maintains consistent rhythm and theme\n\
             5. Is creative yet truthful to the facts\n\
             \n\
             Context Facts:\n{facts}\n\
             \n\
             Previous Lines:\n{conversation}\n\
             \n\
             Create the next line of the poem. Output ONLY the verse, nothing else."
        );
        let user = format!("Create the next poetic line based on: {context}");

        let verse = self.model.complete(&system, &user).await?;
        Ok(verse.trim().to_string())
    }
}

/// Scores both finished poems against the grounding material.
pub struct JudgeAgent {
    model: DynLanguageModel,
    retriever: DynRetriever,
    rubric: RubricConfig,
    snippet_cap: usize,
}

impl JudgeAgent {
    pub fn new(
        model: DynLanguageModel,
        retriever: DynRetriever,
        rubric: RubricConfig,
        snippet_cap: usize,
    ) -> Self {
        Self {
            model,
            retriever,
            rubric,
            snippet_cap,
        }
    }

    /// Request a scoring report for both line sequences. Both sides must be
    /// non-empty. Returns the judge's raw text without interpreting it; an
    /// empty response is a scoring failure, not a report.
    #[instrument(name = "agent.judge", skip_all, fields(lines_a = lines_a.len(), lines_b = lines_b.len()))]
    pub async fn score(
        &self,
        lines_a: &[String],
        lines_b: &[String],
        context: &str,
    ) -> Result<String, VerseDuelError> {
        if lines_a.is_empty() || lines_b.is_empty() {
            return Err(VerseDuelError::InsufficientContent);
        }

        let snippets = self
            .retriever
            .retrieve(context, self.snippet_cap)
            .await
            .map_err(VerseDuelError::scoring)?;
        let facts = snippets
            .iter()
            .map(|snippet| snippet.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let system = self.rubric_prompt(&facts);
        let user = format!(
            "Poem A:\n{}\n\nPoem B:\n{}\n\nContext: {context}\n\nJudge these poems.",
            numbered(lines_a),
            numbered(lines_b)
        );

        let raw = self
            .model
            .complete(&system, &user)
            .await
            .map_err(VerseDuelError::scoring)?;
        if raw.trim().is_empty() {
            return Err(VerseDuelError::scoring(anyhow!(
                "judge returned empty output"
            )));
        }
        Ok(raw)
    }

    fn rubric_prompt(&self, facts: &str) -> String {
        let r = &self.rubric;
        format!(
            "You are an expert poetry critic and judge. Evaluate two poems based on:\n\
             \n\
             JUDGING CRITERIA (Total: 100 points):\n\
             \n\
             1. FACTUAL ACCURACY ({grounding} points):\n\
                - Are verses grounded in the provided facts?\n\
                - Any factual errors or unsupported claims?\n\
                - Score: 0-{grounding}\n\
             \n\
             2. LITERARY QUALITY ({literary} points):\n\
                - Use of metaphors, similes, and imagery\n\
                - Literary devices and emotional resonance\n\
                - Score: 0-{literary}\n\
             \n\
             3. COHERENCE ({coherence} points):\n\
                - Do verses flow naturally?\n\
                - Consistent theme and logical progression\n\
                - Score: 0-{coherence}\n\
             \n\
             4. CREATIVITY ({originality} points):\n\
                - Originality of expression, unique perspective\n\
                - Score: 0-{originality}\n\
             \n\
             5. RHYTHM & SOUND ({sound} points):\n\
                - Musicality, meter, phonetic appeal\n\
                - Score: 0-{sound}\n\
             \n\
             Provide your judgment in this EXACT format:\n\
             \n\
             POEM A SCORES:\n\
             Factual Accuracy: X/{grounding}\n\
             Literary Quality: X/{literary}\n\
             Coherence: X/{coherence}\n\
             Creativity: X/{originality}\n\
             Rhythm & Sound: X/{sound}\n\
             TOTAL: X/100\n\
             \n\
             POEM B SCORES:\n\
             Factual Accuracy: X/{grounding}\n\
             Literary Quality: X/{literary}\n\
             Coherence: X/{coherence}\n\
             Creativity: X/{originality}\n\
             Rhythm & Sound: X/{sound}\n\
             TOTAL: X/100\n\
             \n\
             WINNER: [Poem A or Poem B]\n\
             \n\
             JUSTIFICATION:\n\
             [2-3 sentences explaining the decision]\n\
             \n\
             Source Facts for Verification:\n{facts}",
            grounding = r.grounding,
            literary = r.literary,
            coherence = r.coherence,
            originality = r.originality,
            sound = r.sound,
        )
    }
}

fn numbered(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}. {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::ScriptedModel;
    use crate::retrieval::{IngestDocument, MemoryRetriever, Retriever};

    async fn seeded_retriever() -> Arc<MemoryRetriever> {
        let retriever = Arc::new(MemoryRetriever::new());
        retriever
            .ingest(vec![
                IngestDocument {
                    id: "1".into(),
                    text: "The trench reaches eleven kilometres down".into(),
                    source: None,
                },
                IngestDocument {
                    id: "2".into(),
                    text: "Bioluminescent fish drift through the trench dark".into(),
                    source: None,
                },
                IngestDocument {
                    id: "3".into(),
                    text: "Unrelated meadow flowers bloom in spring".into(),
                    source: None,
                },
            ])
            .await
            .unwrap();
        retriever
    }

    #[tokio::test]
    async fn first_verse_prompt_uses_fallback_history() {
        let retriever = seeded_retriever().await;
        let model = Arc::new(ScriptedModel::new(vec!["  A verse about the deep  "]));
        let poet = PoetAgent::new(Role::A, model.clone(), retriever, 2);

        let verse = poet
            .generate_verse("the deep trench", &[])
            .await
            .unwrap();
        assert_eq!(verse, "A verse about the deep");

        let transcript = model.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].system.contains("This is the first line."));
        assert!(transcript[0].system.contains("trench"));
        assert!(
            transcript[0]
                .user
                .contains("Create the next poetic line based on: the deep trench")
        );
    }

    #[tokio::test]
    async fn later_verse_prompt_numbers_the_history() {
        let retriever = seeded_retriever().await;
        let model = Arc::new(ScriptedModel::new(vec!["next line"]));
        let poet = PoetAgent::new(Role::B, model.clone(), retriever, 2);

        let history = vec!["first".to_string(), "second".to_string()];
        poet.generate_verse("the deep trench", &history)
            .await
            .unwrap();

        let transcript = model.transcript().await;
        assert!(transcript[0].system.contains("Line 1: first"));
        assert!(transcript[0].system.contains("Line 2: second"));
        assert!(!transcript[0].system.contains("This is the first line."));
    }

    #[tokio::test]
    async fn verse_prompt_caps_snippets() {
        let retriever = seeded_retriever().await;
        let model = Arc::new(ScriptedModel::new(vec!["line"]));
        let poet = PoetAgent::new(Role::A, model.clone(), retriever, 2);

        poet.generate_verse("trench fish", &[]).await.unwrap();
        let transcript = model.transcript().await;
        // the two trench chunks fit the cap, the meadow chunk does not
        assert!(!transcript[0].system.contains("meadow"));
    }

    #[tokio::test]
    async fn judge_rejects_empty_sides_before_any_call() {
        let retriever = seeded_retriever().await;
        let model = Arc::new(ScriptedModel::new(vec!["unused"]));
        let judge = JudgeAgent::new(
            model.clone(),
            retriever,
            RubricConfig::default(),
            3,
        );

        let lines = vec!["a line".to_string()];
        let err = judge.score(&[], &lines, "ctx").await.unwrap_err();
        assert!(matches!(err, VerseDuelError::InsufficientContent));
        let err = judge.score(&lines, &[], "ctx").await.unwrap_err();
        assert!(matches!(err, VerseDuelError::InsufficientContent));

        assert!(model.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn judge_prompt_numbers_both_poems_and_carries_the_rubric() {
        let retriever = seeded_retriever().await;
        let model = Arc::new(ScriptedModel::new(vec!["TOTAL: 80/100"]));
        let judge = JudgeAgent::new(
            model.clone(),
            retriever,
            RubricConfig::default(),
            3,
        );

        let lines_a = vec!["a one".to_string(), "a two".to_string()];
        let lines_b = vec!["b one".to_string()];
        let raw = judge.score(&lines_a, &lines_b, "trench").await.unwrap();
        assert_eq!(raw, "TOTAL: 80/100");

        let transcript = model.transcript().await;
        assert!(transcript[0].user.contains("Poem A:\n1. a one\n2. a two"));
        assert!(transcript[0].user.contains("Poem B:\n1. b one"));
        assert!(transcript[0].system.contains("FACTUAL ACCURACY (30 points)"));
        assert!(transcript[0].system.contains("RHYTHM & SOUND (10 points)"));
        assert!(transcript[0].system.contains("WINNER: [Poem A or Poem B]"));
    }

    #[tokio::test]
    async fn empty_judge_output_is_a_scoring_failure() {
        let retriever = seeded_retriever().await;
        let model = Arc::new(ScriptedModel::new(vec!["   \n  "]));
        let judge = JudgeAgent::new(model, retriever, RubricConfig::default(), 3);

        let lines = vec!["a line".to_string()];
        let err = judge.score(&lines, &lines, "ctx").await.unwrap_err();
        assert!(matches!(err, VerseDuelError::ScoringFailure { .. }));
    }
}
