use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::assessment::engine::AssessmentEngine;
use crate::assessment::context::{AnswerSet, ProfileFacts};
use crate::assessment::repository::InMemoryRunStore;
use crate::assessment::schema::{
    AnswerOption, AnswerToken, AssessmentSchema, Dimension, FlagRules, GateResult, GateRule,
    ProfileOption, ProfileQuestion, Question, QuestionFlag, ScoreBand, Section,
};
use crate::assessment::service::AssessmentService;

pub(super) fn option(value: AnswerToken, label: &str) -> AnswerOption {
    AnswerOption {
        value,
        label: label.to_string(),
        score_value: None,
    }
}

pub(super) fn scored_option(
    value: AnswerToken,
    label: &str,
    score_value: AnswerToken,
) -> AnswerOption {
    AnswerOption {
        value,
        label: label.to_string(),
        score_value: Some(score_value),
    }
}

pub(super) fn standard_options() -> Vec<AnswerOption> {
    vec![
        option(AnswerToken::Yes, "Yes"),
        option(AnswerToken::Partial, "Partially"),
        option(AnswerToken::No, "No"),
        option(AnswerToken::NotSure, "Not sure"),
    ]
}

pub(super) fn na_options() -> Vec<AnswerOption> {
    let mut options = standard_options();
    options.push(option(AnswerToken::Na, "Not applicable"));
    options
}

pub(super) fn question(id: &str, item_id: &str, section_id: &str, prompt: &str) -> Question {
    Question {
        id: id.to_string(),
        item_id: item_id.to_string(),
        section_id: section_id.to_string(),
        dimension: None,
        weight: 1,
        prompt: prompt.to_string(),
        options: standard_options(),
        applies_if: "always".to_string(),
        system_na: false,
    }
}

pub(super) fn conditional_question(
    id: &str,
    item_id: &str,
    section_id: &str,
    prompt: &str,
    applies_if: &str,
    system_na: bool,
) -> Question {
    Question {
        options: na_options(),
        applies_if: applies_if.to_string(),
        system_na,
        ..question(id, item_id, section_id, prompt)
    }
}

pub(super) fn answer_scoring() -> BTreeMap<AnswerToken, Option<f64>> {
    BTreeMap::from([
        (AnswerToken::Yes, Some(1.0)),
        (AnswerToken::Partial, Some(0.5)),
        (AnswerToken::No, Some(0.0)),
        (AnswerToken::NotSure, Some(0.25)),
        (AnswerToken::Na, None),
    ])
}

pub(super) fn score_bands() -> Vec<ScoreBand> {
    vec![
        ScoreBand {
            min: 0.0,
            max: 39.0,
            label: "Low Readiness / High Risk".to_string(),
        },
        ScoreBand {
            min: 40.0,
            max: 59.0,
            label: "Limited Preparedness".to_string(),
        },
        ScoreBand {
            min: 60.0,
            max: 79.0,
            label: "Moderately Prepared".to_string(),
        },
        ScoreBand {
            min: 80.0,
            max: 100.0,
            label: "Highly Prepared".to_string(),
        },
    ]
}

pub(super) fn profile_question(field: &str, prompt: &str) -> ProfileQuestion {
    ProfileQuestion {
        id: format!("profile.{field}"),
        field: field.to_string(),
        prompt: prompt.to_string(),
        options: vec![
            ProfileOption {
                value: "yes".to_string(),
                label: "Yes".to_string(),
            },
            ProfileOption {
                value: "no".to_string(),
                label: "No".to_string(),
            },
        ],
        value_map: BTreeMap::from([("yes".to_string(), true), ("no".to_string(), false)]),
    }
}

pub(super) fn gate(
    when: &str,
    questions: &[&str],
    result: GateResult,
    flag: Option<QuestionFlag>,
) -> GateRule {
    GateRule {
        when: when.to_string(),
        questions: questions.iter().map(|id| id.to_string()).collect(),
        result,
        flag,
    }
}

/// Scenario schema: one dimension, one section (weight 1), `Q1` always
/// applicable and `Q2` gated on `Q1 == yes` with `system_na`.
pub(super) fn two_question_schema() -> AssessmentSchema {
    AssessmentSchema {
        assessment_id: "readiness_demo".to_string(),
        version: "v1".to_string(),
        dimensions: vec![Dimension {
            id: "Preparedness".to_string(),
            label: "Preparedness".to_string(),
            weight: None,
        }],
        sections: vec![Section {
            id: "1".to_string(),
            label: "Essentials".to_string(),
            dimension: "Preparedness".to_string(),
            weight: 1.0,
        }],
        profile_questions: Vec::new(),
        profile_gates: Vec::new(),
        soft_gates: Vec::new(),
        answer_scoring: answer_scoring(),
        flags: FlagRules::default(),
        score_bands: score_bands(),
        questions: vec![
            question("Q1", "essentials.plan.exists", "1", "Do you have a plan?"),
            conditional_question(
                "Q2",
                "essentials.plan.current",
                "1",
                "Is the plan up to date?",
                "answers['Q1'] == 'yes'",
                true,
            ),
        ],
    }
}

/// Schema with a profile-gated pet question plus paired soft gates, used by
/// the gate resolution and precedence scenarios.
pub(super) fn pet_schema() -> AssessmentSchema {
    AssessmentSchema {
        assessment_id: "readiness_pets".to_string(),
        version: "v1".to_string(),
        dimensions: vec![Dimension {
            id: "Home_Pet_Daily_Life".to_string(),
            label: "Home, Pet & Daily Life".to_string(),
            weight: None,
        }],
        sections: vec![Section {
            id: "5".to_string(),
            label: "Home, Pet & Daily Life".to_string(),
            dimension: "Home_Pet_Daily_Life".to_string(),
            weight: 10.0,
        }],
        profile_questions: vec![profile_question(
            "pets.has_pets",
            "Do you have pets that depend on you?",
        )],
        profile_gates: vec![gate(
            "profile.pets.has_pets == false",
            &["5.4"],
            GateResult::Na,
            Some(QuestionFlag::NotApplicable),
        )],
        soft_gates: vec![
            gate(
                "profile.pets.has_pets == true",
                &["5.4"],
                GateResult::Ask,
                None,
            ),
            gate(
                "answers['5.1'] == 'yes'",
                &["5.4"],
                GateResult::Ask,
                None,
            ),
            gate(
                "profile.pets.has_pets == false",
                &["5.4"],
                GateResult::Na,
                Some(QuestionFlag::FollowUp),
            ),
        ],
        answer_scoring: answer_scoring(),
        flags: FlagRules::default(),
        score_bands: score_bands(),
        questions: vec![
            question(
                "5.1",
                "home.daily_responsibilities.plan",
                "5",
                "Is there a plan for daily responsibilities?",
            ),
            Question {
                options: na_options(),
                ..question(
                    "5.4",
                    "home.pets.care_plan",
                    "5",
                    "Is there a written plan for pet care?",
                )
            },
        ],
    }
}

pub(super) fn engine(schema: AssessmentSchema) -> AssessmentEngine {
    AssessmentEngine::new(schema).expect("schema compiles")
}

pub(super) fn answers(pairs: &[(&str, AnswerToken)]) -> AnswerSet {
    pairs
        .iter()
        .map(|(id, token)| (id.to_string(), *token))
        .collect()
}

pub(super) fn profile(pairs: &[(&str, bool)]) -> ProfileFacts {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), *value))
        .collect()
}

pub(super) fn build_service() -> (
    Arc<AssessmentService<InMemoryRunStore>>,
    Arc<InMemoryRunStore>,
) {
    let store = Arc::new(InMemoryRunStore::default());
    let service = Arc::new(AssessmentService::new(
        Arc::new(engine(two_question_schema())),
        store.clone(),
    ));
    (service, store)
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
