use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::services::session::RoundRecord;

pub const RATING_TARGET: &str = "teacher_feedback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingTag {
    Clear,
    Unclear,
    Bad,
}

impl RatingTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            RatingTag::Clear => "clear",
            RatingTag::Unclear => "unclear",
            RatingTag::Bad => "bad",
        }
    }
}

/// Fire-and-forget quality signal for offline review of coach feedback.
pub fn record_rating(session_id: Uuid, round: usize, record: &RoundRecord, rating: RatingTag) {
    info!(
        target: RATING_TARGET,
        session_id = %session_id,
        round,
        rating = rating.as_str(),
        prompt = %record.prompt,
        answer = %record.answer,
        score = record.evaluation.score,
        focus = record.evaluation.focus.as_deref().unwrap_or(""),
        source = record.evaluation.source.as_str(),
        feedback = %record.evaluation.feedback,
        "teacher rating"
    );
}
