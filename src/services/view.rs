//! Read-only projections of a session, rebuilt after every transition.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::services::evaluation::{Evaluation, EvaluationSource};
use crate::services::session::{GameSession, Phase, PhaseKind, SessionSummary};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: PhaseKind,
    pub lang: String,
    pub round: usize,
    pub rounds: usize,
    pub progress: u8,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RoundFeedbackView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundFeedbackView {
    pub heading: String,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub feedback: String,
    pub source: EvaluationSource,
    pub is_last_round: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub verdict: &'static str,
    pub recommendation: &'static str,
    pub average: u8,
    pub elapsed_secs: u64,
    pub scores: Vec<u8>,
    pub scores_line: String,
}

impl SessionView {
    pub fn project(session: &GameSession) -> Self {
        let round = session.round_index();
        let rounds = session.total_rounds();

        let result = match session.phase() {
            Phase::RoundComplete(evaluation) => {
                Some(RoundFeedbackView::project(evaluation, round, rounds))
            }
            _ => None,
        };
        let summary = match session.phase() {
            Phase::SessionComplete(summary) => Some(SummaryView::project(summary)),
            _ => None,
        };

        Self {
            session_id: session.id(),
            phase: session.phase().kind(),
            lang: session.lang().to_string(),
            round,
            rounds,
            progress: progress_percent(round, rounds),
            task: session.current_prompt().to_string(),
            started_at: session.started_at(),
            result,
            summary,
        }
    }
}

impl RoundFeedbackView {
    pub fn project(evaluation: &Evaluation, round: usize, rounds: usize) -> Self {
        Self {
            heading: format!("Round {round}/{rounds}"),
            score: evaluation.score,
            focus: evaluation.focus.clone(),
            feedback: evaluation.feedback.clone(),
            source: evaluation.source,
            is_last_round: round >= rounds,
        }
    }
}

impl SummaryView {
    pub fn project(summary: &SessionSummary) -> Self {
        Self {
            verdict: summary.tier.label(),
            recommendation: summary.tier.recommendation(),
            average: summary.average,
            elapsed_secs: summary.elapsed_secs,
            scores: summary.scores.clone(),
            scores_line: summary
                .scores
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(" → "),
        }
    }
}

pub fn progress_percent(round: usize, rounds: usize) -> u8 {
    if rounds == 0 {
        return 0;
    }
    let pct = (round as f64 / rounds as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
