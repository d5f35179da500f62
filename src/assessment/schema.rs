use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Closed set of answer tokens an assessment question can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerToken {
    Yes,
    Partial,
    No,
    NotSure,
    Na,
}

impl AnswerToken {
    pub const fn label(self) -> &'static str {
        match self {
            AnswerToken::Yes => "yes",
            AnswerToken::Partial => "partial",
            AnswerToken::No => "no",
            AnswerToken::NotSure => "not_sure",
            AnswerToken::Na => "na",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "yes" => Some(AnswerToken::Yes),
            "partial" => Some(AnswerToken::Partial),
            "no" => Some(AnswerToken::No),
            "not_sure" => Some(AnswerToken::NotSure),
            "na" => Some(AnswerToken::Na),
            _ => None,
        }
    }
}

/// Flags attached to individual questions during a run. Flags never alter the
/// numeric score; they are reporting metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionFlag {
    Review,
    FollowUp,
    NotApplicable,
    Risk,
    InvalidAnswer,
}

impl QuestionFlag {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionFlag::Review => "review",
            QuestionFlag::FollowUp => "follow_up",
            QuestionFlag::NotApplicable => "not_applicable",
            QuestionFlag::Risk => "risk",
            QuestionFlag::InvalidAnswer => "invalid_answer",
        }
    }
}

/// Top-level scoring category grouping one or more sections.
///
/// `weight` is optional; when absent a dimension's contribution to the overall
/// score is derived from the summed weight of its scored sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Weighted group of questions within a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub label: String,
    pub dimension: String,
    pub weight: f64,
}

/// Selectable choice on a question. `score_value` redirects scoring lookup so
/// two literal choices can share a scoring bucket (for inverted prompts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: AnswerToken,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_value: Option<AnswerToken>,
}

impl AnswerOption {
    /// Token resolved through `answer_scoring` for this option.
    pub fn scoring_token(&self) -> AnswerToken {
        self.score_value.unwrap_or(self.value)
    }
}

fn default_applies_if() -> String {
    "always".to_string()
}

fn default_question_weight() -> u32 {
    1
}

/// One scored questionnaire item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub item_id: String,
    pub section_id: String,
    /// Redundant with the section's dimension; validated for agreement when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(default = "default_question_weight")]
    pub weight: u32,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
    #[serde(default = "default_applies_if")]
    pub applies_if: String,
    #[serde(default)]
    pub system_na: bool,
}

/// Choice offered on a preliminary profile question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileOption {
    pub value: String,
    pub label: String,
}

/// Preliminary yes/no question producing a named boolean fact. Profile
/// questions are consumed by gate and condition predicates, never scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileQuestion {
    pub id: String,
    pub field: String,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<ProfileOption>,
    #[serde(default)]
    pub value_map: BTreeMap<String, bool>,
}

/// Outcome a gate rule assigns to its target questions when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateResult {
    Ask,
    Na,
}

/// Declarative visibility rule over answers and profile facts. Profile gates
/// and soft gates share this shape; the resolver treats the two lists
/// differently (profile gates are authoritative overrides).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRule {
    pub when: String,
    pub questions: Vec<String>,
    pub result: GateResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<QuestionFlag>,
}

/// Answer tokens that raise question-level flags when chosen by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRules {
    #[serde(default = "FlagRules::default_review_on")]
    pub review_on: Vec<AnswerToken>,
    #[serde(default = "FlagRules::default_follow_up_on")]
    pub follow_up_on: Vec<AnswerToken>,
    #[serde(default)]
    pub risk_on: Vec<AnswerToken>,
}

impl FlagRules {
    fn default_review_on() -> Vec<AnswerToken> {
        vec![AnswerToken::NotSure]
    }

    fn default_follow_up_on() -> Vec<AnswerToken> {
        vec![AnswerToken::Na]
    }
}

impl Default for FlagRules {
    fn default() -> Self {
        Self {
            review_on: Self::default_review_on(),
            follow_up_on: Self::default_follow_up_on(),
            risk_on: Vec::new(),
        }
    }
}

/// Labeled score range used to classify the overall result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: f64,
    pub max: f64,
    pub label: String,
}

/// Immutable, versioned questionnaire document.
///
/// Loaded once per assessment version and treated as read-only for the
/// lifetime of every run evaluated against it. Validation and predicate
/// compilation happen in [`super::validate::CompiledSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSchema {
    pub assessment_id: String,
    pub version: String,
    pub dimensions: Vec<Dimension>,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub profile_questions: Vec<ProfileQuestion>,
    #[serde(default)]
    pub profile_gates: Vec<GateRule>,
    #[serde(default)]
    pub soft_gates: Vec<GateRule>,
    pub answer_scoring: BTreeMap<AnswerToken, Option<f64>>,
    #[serde(default)]
    pub flags: FlagRules,
    pub score_bands: Vec<ScoreBand>,
    pub questions: Vec<Question>,
}
