//! Deterministic offline model backends.
//!
//! These stand in for real generation services so duels run end to end
//! without credentials. Outputs are derived from a hash of the prompt, so a
//! given session replays identically while different prompts still vary.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::model::LanguageModel;

const SIMULATED_LATENCY: Duration = Duration::from_millis(25);

const VERSE_TEMPLATES: &[&str] = &[
    "Beneath the {0}, a {1} keeps its patient watch",
    "The {0} answers every {1} with borrowed light",
    "Slow currents of {1} fold across the {0}",
    "Where {0} ends, the {1} begins its quiet work",
    "A hush of {1} settles on the sleeping {0}",
    "Old {0} remembers what the {1} cannot hold",
];

const PROMPT_STOPWORDS: &[&str] = &[
    "create", "next", "poetic", "line", "lines", "based", "this", "that", "with", "from",
    "poem", "verse", "about", "their", "them", "have", "will",
];

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn content_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 4 && !PROMPT_STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Generates one plausible verse per call without any external service.
pub struct OfflineVerseModel;

#[async_trait]
impl LanguageModel for OfflineVerseModel {
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String> {
        sleep(SIMULATED_LATENCY).await;

        let seed = hash_text(system) ^ hash_text(user);
        let mut words = content_words(user);
        if words.is_empty() {
            words = content_words(system);
        }
        if words.is_empty() {
            words = vec!["horizon".to_string(), "tide".to_string()];
        }

        let first = words[(seed as usize) % words.len()].clone();
        let second = words[(seed.rotate_left(17) as usize) % words.len()].clone();
        let template = VERSE_TEMPLATES[(seed.rotate_left(31) as usize) % VERSE_TEMPLATES.len()];

        Ok(template.replace("{0}", &first).replace("{1}", &second))
    }
}

/// Emits a complete judgment in the requested report layout, with scores
/// derived from each poem's text.
pub struct OfflineJudgeModel;

impl OfflineJudgeModel {
    fn criterion_scores(seed: u64) -> [u8; 5] {
        const MAXES: [u8; 5] = [30, 25, 20, 15, 10];
        let mut scores = [0u8; 5];
        let mut rolling = seed;
        for (slot, max) in scores.iter_mut().zip(MAXES) {
            rolling = rolling.rotate_left(13).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            let spread = (max / 3).max(1) as u64;
            *slot = max - (rolling % spread) as u8;
        }
        scores
    }

    fn render_section(label: &str, scores: &[u8; 5]) -> String {
        let total: u32 = scores.iter().map(|s| *s as u32).sum();
        format!(
            "{label} SCORES:\n\
             Factual Accuracy: {}/30\n\
             Literary Quality: {}/25\n\
             Coherence: {}/20\n\
             Creativity: {}/15\n\
             Rhythm & Sound: {}/10\n\
             TOTAL: {total}/100",
            scores[0], scores[1], scores[2], scores[3], scores[4]
        )
    }
}

#[async_trait]
impl LanguageModel for OfflineJudgeModel {
    async fn complete(&self, _system: &str, user: &str) -> anyhow::Result<String> {
        sleep(SIMULATED_LATENCY).await;

        let seed = hash_text(user);
        let scores_a = Self::criterion_scores(seed);
        let scores_b = Self::criterion_scores(seed.rotate_left(29) ^ 0xA5A5_A5A5);
        let total_a: u32 = scores_a.iter().map(|s| *s as u32).sum();
        let total_b: u32 = scores_b.iter().map(|s| *s as u32).sum();

        // ties go to the opener
        let (winner, reason) = if total_b > total_a {
            ("Poem B", "sustained imagery with tighter grounding")
        } else {
            ("Poem A", "stronger grounding and a steadier through-line")
        };

        Ok(format!(
            "{}\n\n{}\n\nWINNER: [{winner}]\n\nJUSTIFICATION:\nThe winning poem shows {reason}.",
            Self::render_section("POEM A", &scores_a),
            Self::render_section("POEM B", &scores_b),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::parse_score_report;

    #[tokio::test]
    async fn verse_model_is_deterministic_and_single_line() {
        let model = OfflineVerseModel;
        let first = model
            .complete("sys", "Create the next poetic line based on: the deep ocean trench")
            .await
            .unwrap();
        let second = model
            .complete("sys", "Create the next poetic line based on: the deep ocean trench")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(!first.trim().is_empty());
        assert!(!first.contains('\n'));
    }

    #[tokio::test]
    async fn judge_model_output_parses_cleanly() {
        let model = OfflineJudgeModel;
        let raw = model
            .complete("judge instructions", "Poem A:\n1. a\n\nPoem B:\n1. b")
            .await
            .unwrap();

        let report = parse_score_report(&raw);
        assert!(!report.is_degraded());
        assert!(report.score_a <= 100 && report.score_a > 0);
        assert!(report.score_b <= 100 && report.score_b > 0);
        assert!(report.winner_role().is_some());
    }
}
