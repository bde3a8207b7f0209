//! Session state machine for a poem duel.
//!
//! A session owns the turn order, the accumulated line sequences, and the
//! phase transitions. It performs no I/O and calls no agents; the runner in
//! `duel.rs` drives it. Phases are an explicit enum with a single transition
//! rule rather than callback wiring, so the legal state space is visible in
//! one place.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VerseDuelError;
use crate::report::ScoreReport;

/// Lifecycle phase of a duel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Poets are still taking turns.
    Generating,
    /// The turn budget is exhausted; waiting on the judge.
    Scoring,
    /// A score report has been recorded; the session is immutable.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Generating => "generating",
            Phase::Scoring => "scoring",
            Phase::Done => "done",
        };
        write!(f, "{label}")
    }
}

/// The two competing generator roles. Role A always opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    A,
    B,
}

impl Role {
    /// Presentation label used in prompts and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Role::A => "Poem A",
            Role::B => "Poem B",
        }
    }

    /// Machine-friendly label for trace stages and log fields.
    pub fn slug(&self) -> &'static str {
        match self {
            Role::A => "poem_a",
            Role::B => "poem_b",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// State of one collaborative duel between two poets.
///
/// Maintains `turns_taken == lines_a.len() + lines_b.len()` and strict
/// alternation (A, B, A, B, ...). The deficit `lines_a.len() - lines_b.len()`
/// is always 0 or 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelSession {
    context: String,
    lines_a: Vec<String>,
    lines_b: Vec<String>,
    turns_taken: u32,
    target_turns: i32,
    report: Option<ScoreReport>,
    phase: Phase,
}

impl DuelSession {
    /// Start a session over a fixed grounding context.
    ///
    /// `target_turns` is the shared budget across both roles. A value of zero
    /// or below is accepted: the session starts directly in `Scoring` with
    /// empty line sequences (scoring will then reject the empty sides).
    pub fn new(context: impl Into<String>, target_turns: i32) -> Self {
        let mut session = Self {
            context: context.into(),
            lines_a: Vec::new(),
            lines_b: Vec::new(),
            turns_taken: 0,
            target_turns,
            report: None,
            phase: Phase::Generating,
        };
        session.apply_transition();
        session
    }

    /// Single transition rule, evaluated at construction and after every
    /// recorded turn.
    fn apply_transition(&mut self) {
        if self.phase == Phase::Generating && self.turns_taken as i64 >= self.target_turns as i64 {
            tracing::debug!(
                turns_taken = self.turns_taken,
                target_turns = self.target_turns,
                "turn budget exhausted, moving to scoring"
            );
            self.phase = Phase::Scoring;
        }
    }

    /// Role whose turn it is, or `None` once generation has finished.
    ///
    /// Even turn indices (0-based) belong to A, odd to B.
    pub fn next_role(&self) -> Option<Role> {
        if self.phase != Phase::Generating {
            return None;
        }
        Some(if self.turns_taken % 2 == 0 {
            Role::A
        } else {
            Role::B
        })
    }

    /// Record one completed generation turn.
    ///
    /// Rejects out-of-turn roles and wrong-phase calls without mutating
    /// anything; a turn either fully appends and increments, or fails.
    pub fn record_line(&mut self, role: Role, line: String) -> Result<(), VerseDuelError> {
        let expected = self.next_role();
        if expected != Some(role) {
            return Err(VerseDuelError::TurnOrder {
                expected,
                got: role,
            });
        }
        match role {
            Role::A => self.lines_a.push(line),
            Role::B => self.lines_b.push(line),
        }
        self.turns_taken += 1;
        self.apply_transition();
        Ok(())
    }

    /// Attach the score report and finish the session.
    pub fn complete_scoring(&mut self, report: ScoreReport) -> Result<(), VerseDuelError> {
        if self.phase != Phase::Scoring {
            return Err(VerseDuelError::OutOfPhase { phase: self.phase });
        }
        self.report = Some(report);
        self.phase = Phase::Done;
        Ok(())
    }

    /// Both poets' lines in true chronological turn order (A1, B1, A2, ...).
    pub fn history(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.turns_taken as usize);
        for i in 0..self.turns_taken as usize {
            let line = if i % 2 == 0 {
                self.lines_a.get(i / 2)
            } else {
                self.lines_b.get(i / 2)
            };
            if let Some(line) = line {
                lines.push(line.clone());
            }
        }
        lines
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn lines_a(&self) -> &[String] {
        &self.lines_a
    }

    pub fn lines_b(&self) -> &[String] {
        &self.lines_b
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    pub fn target_turns(&self) -> i32 {
        self.target_turns
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    /// Consume the session, yielding the line sequences and report.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>, Option<ScoreReport>) {
        (self.lines_a, self.lines_b, self.report)
    }
}
