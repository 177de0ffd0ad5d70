use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::services::evaluation::Evaluation;
use crate::services::tier::{rounded_mean, Tier, TierThresholds};

/// Fixed set of description tasks. Draws are uniform with replacement.
#[derive(Debug, Clone)]
pub struct PromptBank {
    prompts: Vec<String>,
}

impl PromptBank {
    pub fn new<I, S>(prompts: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prompts: Vec<String> = prompts
            .into_iter()
            .map(|p| {
                let p: String = p.into();
                p.trim().to_string()
            })
            .filter(|p| !p.is_empty())
            .collect();
        if prompts.is_empty() {
            None
        } else {
            Some(Self { prompts })
        }
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.prompts.choose(rng).cloned().unwrap_or_default()
    }

    pub fn contains(&self, prompt: &str) -> bool {
        self.prompts.iter().any(|p| p == prompt)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SessionRules {
    pub rounds: usize,
    pub tiers: TierThresholds,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            rounds: 3,
            tiers: TierThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
    AwaitingAnswer,
    Evaluating,
    RoundComplete,
    SessionComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingAnswer,
    Evaluating,
    RoundComplete(Evaluation),
    SessionComplete(SessionSummary),
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::AwaitingAnswer => PhaseKind::AwaitingAnswer,
            Phase::Evaluating => PhaseKind::Evaluating,
            Phase::RoundComplete(_) => PhaseKind::RoundComplete,
            Phase::SessionComplete(_) => PhaseKind::SessionComplete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub prompt: String,
    pub answer: String,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub average: u8,
    pub elapsed_secs: u64,
    pub scores: Vec<u8>,
    pub tier: Tier,
}

/// Issued on submission; must be handed back to apply the evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationTicket {
    generation: u64,
    round: usize,
    pub prompt: String,
    pub answer: String,
    pub lang: String,
}

impl EvaluationTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn round(&self) -> usize {
        self.round
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("session is not awaiting an answer (phase {0:?})")]
    NotAwaitingAnswer(PhaseKind),
    #[error("no completed round to advance from (phase {0:?})")]
    NotRoundComplete(PhaseKind),
    #[error("evaluation belongs to an earlier game")]
    StaleTicket,
    #[error("round {0} has not been played")]
    RoundNotFound(usize),
}

#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    generation: u64,
    lang: String,
    prompts: Arc<PromptBank>,
    rules: SessionRules,
    current_prompt: String,
    rounds: Vec<RoundRecord>,
    started_at: Option<Instant>,
    started_at_utc: Option<DateTime<Utc>>,
    phase: Phase,
    last_activity: Instant,
}

impl GameSession {
    pub fn new(lang: impl Into<String>, prompts: Arc<PromptBank>, rules: SessionRules) -> Self {
        Self::with_rng(lang, prompts, rules, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        lang: impl Into<String>,
        prompts: Arc<PromptBank>,
        rules: SessionRules,
        rng: &mut R,
    ) -> Self {
        let current_prompt = prompts.pick(rng);
        Self {
            id: Uuid::new_v4(),
            generation: 0,
            lang: lang.into(),
            prompts,
            rules: SessionRules {
                rounds: rules.rounds.max(1),
                ..rules
            },
            current_prompt,
            rounds: Vec::new(),
            started_at: None,
            started_at_utc: None,
            phase: Phase::AwaitingAnswer,
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn total_rounds(&self) -> usize {
        self.rules.rounds
    }

    pub fn round_index(&self) -> usize {
        self.rounds.len()
    }

    pub fn scores(&self) -> Vec<u8> {
        self.rounds.iter().map(|r| r.evaluation.score).collect()
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// `round` is 1-based, matching what the learner sees.
    pub fn round(&self, round: usize) -> Result<&RoundRecord, SessionError> {
        round
            .checked_sub(1)
            .and_then(|i| self.rounds.get(i))
            .ok_or(SessionError::RoundNotFound(round))
    }

    pub fn current_prompt(&self) -> &str {
        &self.current_prompt
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at_utc
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// `AwaitingAnswer -> Evaluating`. Starts the timer on the first answer.
    pub fn submit_answer(&mut self, answer: &str) -> Result<EvaluationTicket, SessionError> {
        if self.phase != Phase::AwaitingAnswer {
            return Err(SessionError::NotAwaitingAnswer(self.phase.kind()));
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }

        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            self.started_at_utc = Some(Utc::now());
        }
        self.phase = Phase::Evaluating;
        self.touch();

        Ok(EvaluationTicket {
            generation: self.generation,
            round: self.round_index(),
            prompt: self.current_prompt.clone(),
            answer: answer.to_string(),
            lang: self.lang.clone(),
        })
    }

    /// `Evaluating -> RoundComplete`. Tickets from before a reset are rejected.
    pub fn complete_evaluation(
        &mut self,
        ticket: EvaluationTicket,
        evaluation: Evaluation,
    ) -> Result<(), SessionError> {
        self.check_ticket(&ticket)?;

        self.rounds.push(RoundRecord {
            prompt: ticket.prompt,
            answer: ticket.answer,
            evaluation: evaluation.clone(),
        });
        self.phase = Phase::RoundComplete(evaluation);
        self.touch();
        Ok(())
    }

    /// Releases the submission lock without consuming the round.
    pub fn abandon_evaluation(&mut self, ticket: &EvaluationTicket) -> Result<(), SessionError> {
        self.check_ticket(ticket)?;
        self.phase = Phase::AwaitingAnswer;
        self.touch();
        Ok(())
    }

    fn check_ticket(&self, ticket: &EvaluationTicket) -> Result<(), SessionError> {
        if ticket.generation != self.generation || ticket.round != self.round_index() {
            return Err(SessionError::StaleTicket);
        }
        if self.phase != Phase::Evaluating {
            return Err(SessionError::StaleTicket);
        }
        Ok(())
    }

    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.advance_with_rng(&mut rand::rng())
    }

    /// `RoundComplete -> AwaitingAnswer | SessionComplete`.
    pub fn advance_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::RoundComplete(_)) {
            return Err(SessionError::NotRoundComplete(self.phase.kind()));
        }

        if self.round_index() >= self.rules.rounds {
            self.phase = Phase::SessionComplete(self.summary());
        } else {
            self.current_prompt = self.prompts.pick(rng);
            self.phase = Phase::AwaitingAnswer;
        }
        self.touch();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.reset_with_rng(&mut rand::rng());
    }

    /// Play again: back to round zero from any phase.
    pub fn reset_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.generation = self.generation.wrapping_add(1);
        self.rounds.clear();
        self.started_at = None;
        self.started_at_utc = None;
        self.current_prompt = self.prompts.pick(rng);
        self.phase = Phase::AwaitingAnswer;
        self.touch();
    }

    fn summary(&self) -> SessionSummary {
        let scores = self.scores();
        let average = rounded_mean(&scores);
        SessionSummary {
            average,
            elapsed_secs: self.elapsed().as_secs(),
            tier: self.rules.tiers.classify(average),
            scores,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
