//! End-to-end duel scenarios against the public API, with scripted models
//! standing in for the generation services.

use std::sync::Arc;

use verseduel_core::{
    Config, DuelRunner, IngestDocument, MemoryRetriever, Retriever, Role, ScriptedModel,
    VerseDuelError,
};

const JUDGE_REPORT: &str = "\
POEM A SCORES:
Factual Accuracy: 26/30
Literary Quality: 21/25
Coherence: 17/20
Creativity: 12/15
Rhythm & Sound: 8/10
TOTAL: 84/100

POEM B SCORES:
Factual Accuracy: 24/30
Literary Quality: 19/25
Coherence: 16/20
Creativity: 11/15
Rhythm & Sound: 8/10
TOTAL: 78/100

WINNER: [Poem A]

JUSTIFICATION:
Poem A stays closer to the source material.";

async fn seeded_retriever() -> Arc<MemoryRetriever> {
    let retriever = Arc::new(MemoryRetriever::new());
    retriever
        .ingest(vec![
            IngestDocument {
                id: "1".into(),
                text: "Submersibles map the ocean floor with sonar pulses".into(),
                source: Some("expedition-notes".into()),
            },
            IngestDocument {
                id: "2".into(),
                text: "Ocean exploration reveals hydrothermal vents teeming with life".into(),
                source: Some("expedition-notes".into()),
            },
        ])
        .await
        .unwrap();
    retriever
}

#[tokio::test]
async fn four_turn_duel_alternates_and_names_a_winner() {
    let model_a = Arc::new(ScriptedModel::new(vec!["a1", "a2"]));
    let model_b = Arc::new(ScriptedModel::new(vec!["b1", "b2"]));
    let judge = Arc::new(ScriptedModel::new(vec![JUDGE_REPORT]));
    let runner = DuelRunner::new(
        model_a.clone(),
        model_b.clone(),
        judge.clone(),
        seeded_retriever().await,
        &Config::default(),
    );

    let outcome = runner.run("ocean exploration", 4).await.unwrap();

    assert_eq!(outcome.lines_a, vec!["a1".to_string(), "a2".to_string()]);
    assert_eq!(outcome.lines_b, vec!["b1".to_string(), "b2".to_string()]);
    assert_eq!(outcome.report.score_a, 84);
    assert_eq!(outcome.report.score_b, 78);
    assert_eq!(outcome.winner_role(), Some(Role::A));
    assert_eq!(outcome.report.raw_text, JUDGE_REPORT);
    assert!(!outcome.report.is_degraded());

    // each poet saw the chronological history grown by the prior turns
    let transcript_a = model_a.transcript().await;
    assert_eq!(transcript_a.len(), 2);
    assert!(transcript_a[0].system.contains("This is the first line."));
    assert!(transcript_a[1].system.contains("Line 1: a1"));
    assert!(transcript_a[1].system.contains("Line 2: b1"));

    let transcript_b = model_b.transcript().await;
    assert_eq!(transcript_b.len(), 2);
    assert!(transcript_b[0].system.contains("Line 1: a1"));
    assert!(transcript_b[1].system.contains("Line 3: a2"));

    // the judge was called exactly once, with both complete poems
    let judge_calls = judge.transcript().await;
    assert_eq!(judge_calls.len(), 1);
    assert!(judge_calls[0].user.contains("Poem A:\n1. a1\n2. a2"));
    assert!(judge_calls[0].user.contains("Poem B:\n1. b1\n2. b2"));
}

#[tokio::test]
async fn odd_turn_budget_gives_the_opener_the_extra_line() {
    let runner = DuelRunner::new(
        Arc::new(ScriptedModel::new(vec!["a1", "a2", "a3"])),
        Arc::new(ScriptedModel::new(vec!["b1", "b2"])),
        Arc::new(ScriptedModel::new(vec![JUDGE_REPORT])),
        seeded_retriever().await,
        &Config::default(),
    );

    let outcome = runner.run("ocean exploration", 5).await.unwrap();
    assert_eq!(outcome.lines_a.len(), 3);
    assert_eq!(outcome.lines_b.len(), 2);
}

#[tokio::test]
async fn empty_second_turn_aborts_with_the_failing_role_and_turn() {
    let model_a = Arc::new(ScriptedModel::new(vec!["a1", "a2"]));
    let model_b = Arc::new(ScriptedModel::new(vec![""]));
    let judge = Arc::new(ScriptedModel::new(vec![JUDGE_REPORT]));
    let runner = DuelRunner::new(
        model_a.clone(),
        model_b.clone(),
        judge.clone(),
        seeded_retriever().await,
        &Config::default(),
    );

    let err = runner.run("ocean exploration", 4).await.unwrap_err();
    match err {
        VerseDuelError::GenerationFailure { role, turn, .. } => {
            assert_eq!(role, Role::B);
            assert_eq!(turn, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    // the run stopped at the failing turn: A spoke once, the judge never ran
    assert_eq!(model_a.transcript().await.len(), 1);
    assert_eq!(model_b.transcript().await.len(), 1);
    assert!(judge.transcript().await.is_empty());
}

#[tokio::test]
async fn zero_turn_budget_fails_scoring_on_empty_poems() {
    let model = Arc::new(ScriptedModel::new(vec!["unused"]));
    let runner = DuelRunner::new(
        model.clone(),
        model.clone(),
        model.clone(),
        seeded_retriever().await,
        &Config::default(),
    );

    let err = runner.run("ocean exploration", 0).await.unwrap_err();
    assert!(matches!(err, VerseDuelError::InsufficientContent));
    assert!(model.transcript().await.is_empty());
}

#[tokio::test]
async fn garbled_judge_output_degrades_instead_of_failing() {
    let runner = DuelRunner::new(
        Arc::new(ScriptedModel::new(vec!["a1"])),
        Arc::new(ScriptedModel::new(vec!["b1"])),
        Arc::new(ScriptedModel::new(vec!["the judge rambles with no markers"])),
        seeded_retriever().await,
        &Config::default(),
    );

    let outcome = runner.run("ocean exploration", 2).await.unwrap();
    assert_eq!(outcome.report.score_a, 0);
    assert_eq!(outcome.report.score_b, 0);
    assert!(outcome.report.winner.is_none());
    assert!(outcome.report.is_degraded());
    assert_eq!(outcome.report.raw_text, "the judge rambles with no markers");
}

#[tokio::test]
async fn offline_duel_runs_without_backends_or_documents() {
    let runner = DuelRunner::offline(Arc::new(MemoryRetriever::new()), &Config::default());

    let outcome = runner.run("drift ice under a midnight sun", 6).await.unwrap();
    assert_eq!(outcome.lines_a.len(), 3);
    assert_eq!(outcome.lines_b.len(), 3);
    assert!(!outcome.report.is_degraded());
    assert!(outcome.winner_role().is_some());
    assert_eq!(outcome.trace.len(), 6 + 2); // one per turn, plus scoring and parse
}
