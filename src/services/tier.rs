use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Foundations,
    BuildingControl,
    StrongPerformance,
    ExamLevel,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Foundations => "Foundations Phase",
            Tier::BuildingControl => "Building Control",
            Tier::StrongPerformance => "Strong Performance",
            Tier::ExamLevel => "Exam Level",
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            Tier::Foundations => {
                "Focus on complete sentences: a subject, a verb and one describing word."
            }
            Tier::BuildingControl => {
                "Add connectives and a reason to turn short sentences into developed answers."
            }
            Tier::StrongPerformance => {
                "Vary your tenses and add opinions to push towards exam-level answers."
            }
            Tier::ExamLevel => "Keep practising under time pressure and try more complex structures.",
        }
    }
}

/// Inclusive upper bounds on the rounded mean for the three lower tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TierThresholds {
    pub foundations_max: u8,
    pub building_max: u8,
    pub strong_max: u8,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            foundations_max: 4,
            building_max: 6,
            strong_max: 8,
        }
    }
}

impl TierThresholds {
    pub fn is_ordered(&self) -> bool {
        self.foundations_max < self.building_max && self.building_max < self.strong_max
    }

    pub fn classify(&self, mean: u8) -> Tier {
        if mean <= self.foundations_max {
            Tier::Foundations
        } else if mean <= self.building_max {
            Tier::BuildingControl
        } else if mean <= self.strong_max {
            Tier::StrongPerformance
        } else {
            Tier::ExamLevel
        }
    }
}

/// Mean of the scores rounded half up. Empty input yields zero.
pub fn rounded_mean(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    let n = scores.len() as u32;
    ((2 * sum + n) / (2 * n)) as u8
}
