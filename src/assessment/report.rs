//! Run report value types.
//!
//! A report is regenerated fresh on every evaluation pass and never mutated;
//! it is the shape handed to storage and UI collaborators.

use serde::{Deserialize, Serialize};

use super::applicability::QuestionStatus;
use super::schema::{AnswerToken, QuestionFlag};

/// Status, recorded answer, score, and flags for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub id: String,
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<QuestionFlag>,
}

/// Section rollup. `score` is `None` when no question in the section was
/// scored; such a section is excluded from its dimension's rollup entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub questions_total: usize,
    pub questions_answered: usize,
    pub review_count: usize,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionReport {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Flag counts across the whole run, for UI prioritization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsSummary {
    pub review: usize,
    pub follow_up: usize,
    pub not_applicable: usize,
    pub risk: usize,
    pub invalid_answer: usize,
}

impl FlagsSummary {
    pub(crate) fn count(&mut self, flag: QuestionFlag) {
        match flag {
            QuestionFlag::Review => self.review += 1,
            QuestionFlag::FollowUp => self.follow_up += 1,
            QuestionFlag::NotApplicable => self.not_applicable += 1,
            QuestionFlag::Risk => self.risk += 1,
            QuestionFlag::InvalidAnswer => self.invalid_answer += 1,
        }
    }
}

/// Complete result of one evaluation pass.
///
/// A pure value: evaluating the same schema, answers, and profile twice
/// yields identical reports. `pending_question_ids` tells the caller the
/// assessment is not fully resolved even though a score is already computed
/// from what is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub assessment_id: String,
    pub version: String,
    pub per_question: Vec<QuestionReport>,
    pub sections: Vec<SectionReport>,
    pub dimensions: Vec<DimensionReport>,
    pub overall_score: f64,
    pub band_label: String,
    pub pending_question_ids: Vec<String>,
    pub flags_summary: FlagsSummary,
}

impl RunReport {
    /// True once no question remains in the `pending` state.
    pub fn is_fully_resolved(&self) -> bool {
        self.pending_question_ids.is_empty()
    }
}

/// Priority classification for an improvement item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementPriority {
    High,
    Medium,
    Low,
}

impl ImprovementPriority {
    pub const fn label(self) -> &'static str {
        match self {
            ImprovementPriority::High => "high",
            ImprovementPriority::Medium => "medium",
            ImprovementPriority::Low => "low",
        }
    }
}

/// Answer choice that would raise a question's score above its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementOption {
    pub value: AnswerToken,
    pub label: String,
}

/// A scored-below-full question ranked by the weighted score gain available
/// from answering it better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementItem {
    pub question_id: String,
    pub section_id: String,
    pub section_label: String,
    pub prompt: String,
    pub answer: AnswerToken,
    pub score_fraction: f64,
    pub improvement_potential: f64,
    pub priority: ImprovementPriority,
    pub improvement_options: Vec<ImprovementOption>,
}
