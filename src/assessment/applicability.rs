//! Final per-question visibility decision.
//!
//! Merges the static `applies_if` result with the gate outcome. The four-way
//! split matters: `Pending` suppresses premature display while a prerequisite
//! is unanswered, and `NaSystem` (reportable, flagged) is kept distinct from
//! `Hidden` (silently not asked) even though both are excluded from scoring.

use serde::{Deserialize, Serialize};

use super::expr::Tri;
use super::gates::GateStatus;
use super::schema::{Question, QuestionFlag};

/// Visibility/status decision for one question within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    /// Not asked this round; no score contribution, no flag.
    Hidden,
    /// Not applicable by rule; excluded from scoring with a recorded flag.
    NaSystem,
    /// A prerequisite is unanswered; must not be shown or scored yet.
    Pending,
    /// Shown to the user if unanswered, scored if answered.
    Active,
}

impl QuestionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionStatus::Hidden => "hidden",
            QuestionStatus::NaSystem => "na_system",
            QuestionStatus::Pending => "pending",
            QuestionStatus::Active => "active",
        }
    }
}

/// Status plus the flag recorded when a question is system-marked NA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Disposition {
    pub status: QuestionStatus,
    pub flag: Option<QuestionFlag>,
}

impl Disposition {
    const fn plain(status: QuestionStatus) -> Self {
        Self { status, flag: None }
    }
}

pub(crate) fn resolve(question: &Question, applies: Tri, gate: GateStatus) -> Disposition {
    // A forced gate NA wins regardless of applies_if.
    if let GateStatus::ForcedNa { flag } = gate {
        return Disposition {
            status: QuestionStatus::NaSystem,
            flag: Some(flag),
        };
    }

    if question.system_na {
        match applies {
            Tri::False => {
                return Disposition {
                    status: QuestionStatus::NaSystem,
                    flag: Some(QuestionFlag::NotApplicable),
                }
            }
            Tri::Indeterminate => return Disposition::plain(QuestionStatus::Pending),
            Tri::True => {}
        }
    } else {
        match applies {
            Tri::False => return Disposition::plain(QuestionStatus::Hidden),
            Tri::Indeterminate => return Disposition::plain(QuestionStatus::Pending),
            Tri::True => {}
        }
    }

    match gate {
        GateStatus::Pending => Disposition::plain(QuestionStatus::Pending),
        GateStatus::Ask => Disposition::plain(QuestionStatus::Active),
        // Handled above; unreachable by construction.
        GateStatus::ForcedNa { flag } => Disposition {
            status: QuestionStatus::NaSystem,
            flag: Some(flag),
        },
    }
}
