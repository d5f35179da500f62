use super::common::*;
use crate::assessment::schema::{AnswerToken, GateResult, QuestionFlag, ScoreBand};
use crate::assessment::validate::{CompiledSchema, SchemaValidationError};

#[test]
fn compiles_well_formed_schema() {
    let compiled = CompiledSchema::compile(two_question_schema()).expect("compiles");
    assert_eq!(compiled.schema().questions.len(), 2);
    assert_eq!(compiled.question_position("Q2"), Some(1));
}

#[test]
fn rejects_duplicate_question_ids() {
    let mut schema = two_question_schema();
    schema
        .questions
        .push(question("Q1", "essentials.plan.copy", "1", "Duplicate"));

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::DuplicateQuestion(id) if id == "Q1"
    ));
}

#[test]
fn rejects_unknown_section_reference() {
    let mut schema = two_question_schema();
    schema.questions[0].section_id = "9".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::UnknownSection { question, section }
            if question == "Q1" && section == "9"
    ));
}

#[test]
fn rejects_unknown_dimension_reference() {
    let mut schema = two_question_schema();
    schema.sections[0].dimension = "Unknown".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(err, SchemaValidationError::UnknownDimension { .. }));
}

#[test]
fn rejects_dimension_mismatch_on_question() {
    let mut schema = two_question_schema();
    schema.questions[0].dimension = Some("Somewhere_Else".to_string());

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::DimensionMismatch { question, .. } if question == "Q1"
    ));
}

#[test]
fn rejects_duplicate_option_values() {
    // Two literal `no` choices on one question must be flagged, not resolved
    // last-wins.
    let mut schema = two_question_schema();
    schema.questions[0]
        .options
        .push(option(AnswerToken::No, "None at all"));

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::DuplicateOptionValue { question, value }
            if question == "Q1" && value == "no"
    ));
}

#[test]
fn rejects_zero_question_weight() {
    let mut schema = two_question_schema();
    schema.questions[0].weight = 0;

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::ZeroQuestionWeight { question } if question == "Q1"
    ));
}

#[test]
fn rejects_forward_reference_in_applies_if() {
    let mut schema = two_question_schema();
    // Q1 referencing Q2 inverts evaluation order.
    schema.questions[0].applies_if = "answers['Q2'] == 'yes'".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::ForwardReference { question, .. } if question == "Q2"
    ));
}

#[test]
fn rejects_self_reference_in_applies_if() {
    let mut schema = two_question_schema();
    schema.questions[1].applies_if = "answers['Q2'] == 'yes'".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(err, SchemaValidationError::ForwardReference { .. }));
}

#[test]
fn rejects_unknown_question_reference() {
    let mut schema = two_question_schema();
    schema.questions[1].applies_if = "answers['Q9'] == 'yes'".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::UnknownQuestionReference { question, .. } if question == "Q9"
    ));
}

#[test]
fn rejects_unknown_profile_field() {
    let mut schema = pet_schema();
    schema.questions[1].applies_if = "profile.home.owns_real_property == true".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::UnknownProfileField { field, .. }
            if field == "home.owns_real_property"
    ));
}

#[test]
fn rejects_malformed_predicate_at_load_time() {
    let mut schema = two_question_schema();
    schema.questions[1].applies_if = "answers['Q1'] == ".to_string();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::MalformedPredicate { context, .. }
            if context.contains("Q2")
    ));
}

#[test]
fn rejects_gate_targeting_unknown_question() {
    let mut schema = pet_schema();
    schema.profile_gates[0].questions = vec!["5.9".to_string()];

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::UnknownGateTarget { question, .. } if question == "5.9"
    ));
}

#[test]
fn rejects_profile_gate_with_ask_result() {
    let mut schema = pet_schema();
    schema.profile_gates[0].result = GateResult::Ask;

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::InvalidProfileGateResult { .. }
    ));
}

#[test]
fn rejects_soft_gate_reading_its_own_target() {
    let mut schema = pet_schema();
    schema.soft_gates.push(gate(
        "answers['5.4'] == 'yes'",
        &["5.4"],
        GateResult::Ask,
        None,
    ));

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::ForwardReference { question, .. } if question == "5.4"
    ));
}

#[test]
fn rejects_missing_scoring_entry() {
    let mut schema = two_question_schema();
    schema.answer_scoring.remove(&AnswerToken::Na);

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::MissingScoringEntry { token, .. } if token == "na"
    ));
}

#[test]
fn rejects_scoring_value_out_of_range() {
    let mut schema = two_question_schema();
    schema
        .answer_scoring
        .insert(AnswerToken::Yes, Some(1.5));

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::ScoreOutOfRange { token, .. } if token == "yes"
    ));
}

#[test]
fn rejects_band_gap() {
    let mut schema = two_question_schema();
    schema.score_bands = vec![
        ScoreBand {
            min: 0.0,
            max: 39.0,
            label: "Low".to_string(),
        },
        ScoreBand {
            min: 50.0,
            max: 100.0,
            label: "High".to_string(),
        },
    ];

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(
        err,
        SchemaValidationError::BandCoverage(label) if label == "High"
    ));
}

#[test]
fn rejects_bands_not_reaching_100() {
    let mut schema = two_question_schema();
    schema.score_bands = vec![ScoreBand {
        min: 0.0,
        max: 80.0,
        label: "Only".to_string(),
    }];

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(err, SchemaValidationError::BandCoverage(_)));
}

#[test]
fn rejects_empty_bands() {
    let mut schema = two_question_schema();
    schema.score_bands.clear();

    let err = CompiledSchema::compile(schema).expect_err("must fail");
    assert!(matches!(err, SchemaValidationError::NoScoreBands));
}

#[test]
fn accepts_bands_sharing_a_boundary() {
    let mut schema = two_question_schema();
    schema.score_bands = vec![
        ScoreBand {
            min: 0.0,
            max: 40.0,
            label: "Low".to_string(),
        },
        ScoreBand {
            min: 40.0,
            max: 100.0,
            label: "High".to_string(),
        },
    ];

    assert!(CompiledSchema::compile(schema).is_ok());
}

#[test]
fn profile_gate_flag_defaults_are_preserved() {
    let compiled = CompiledSchema::compile(pet_schema()).expect("compiles");
    assert_eq!(
        compiled.schema().profile_gates[0].flag,
        Some(QuestionFlag::NotApplicable)
    );
}
