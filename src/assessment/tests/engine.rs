use super::common::*;
use crate::assessment::applicability::QuestionStatus;
use crate::assessment::schema::{AnswerToken, Question, QuestionFlag};

#[test]
fn negative_answer_marks_dependent_question_system_na() {
    // Scenario: Q1 answered 'no' resolves the gated Q2 to system NA and the
    // section scores from Q1 alone.
    let engine = engine(two_question_schema());
    let report = engine.evaluate(&answers(&[("Q1", AnswerToken::No)]), &profile(&[]));

    let q2 = &report.per_question[1];
    assert_eq!(q2.status, QuestionStatus::NaSystem);
    assert_eq!(q2.answer, Some(AnswerToken::Na));
    assert_eq!(q2.score, None);
    assert!(q2.flags.contains(&QuestionFlag::NotApplicable));

    assert_eq!(report.sections[0].score, Some(0.0));
    assert_eq!(report.overall_score, 0.0);
    assert_eq!(report.band_label, "Low Readiness / High Risk");
    assert!(report.is_fully_resolved());
}

#[test]
fn positive_answer_activates_dependent_question() {
    // Scenario: Q1 = 'yes' with Q2 unanswered still produces a report; Q2 is
    // active and listed as pending resolution.
    let engine = engine(two_question_schema());
    let report = engine.evaluate(&answers(&[("Q1", AnswerToken::Yes)]), &profile(&[]));

    let q2 = &report.per_question[1];
    assert_eq!(q2.status, QuestionStatus::Active);
    assert_eq!(q2.answer, None);

    assert_eq!(report.pending_question_ids, vec!["Q2".to_string()]);
    assert!(!report.is_fully_resolved());
    assert_eq!(report.sections[0].score, Some(100.0));
    assert_eq!(report.band_label, "Highly Prepared");
}

#[test]
fn unset_profile_fact_keeps_gated_question_pending() {
    // Scenario: the profile gate cannot fire while the fact is unknown; the
    // soft-gate fallback holds the question pending.
    let engine = engine(pet_schema());
    let report = engine.evaluate(&answers(&[]), &profile(&[]));

    let pet_question = &report.per_question[1];
    assert_eq!(pet_question.status, QuestionStatus::Pending);
    assert!(report
        .pending_question_ids
        .contains(&"5.4".to_string()));

    let resolved = engine.evaluate(&answers(&[]), &profile(&[("pets.has_pets", false)]));
    assert_eq!(resolved.per_question[1].status, QuestionStatus::NaSystem);
    assert!(resolved.per_question[1]
        .flags
        .contains(&QuestionFlag::NotApplicable));
}

#[test]
fn evaluation_is_idempotent() {
    let engine = engine(pet_schema());
    let answer_set = answers(&[("5.1", AnswerToken::Partial)]);
    let facts = profile(&[("pets.has_pets", true)]);

    let first = engine.evaluate(&answer_set, &facts);
    let second = engine.evaluate(&answer_set, &facts);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serializes"),
        serde_json::to_string(&second).expect("serializes")
    );
}

#[test]
fn resolution_is_monotonic_as_answers_arrive() {
    let engine = engine(two_question_schema());

    let resolved_count = |report: &crate::assessment::report::RunReport| {
        report
            .per_question
            .iter()
            .filter(|question| question.status != QuestionStatus::Pending)
            .count()
    };

    let empty = engine.evaluate(&answers(&[]), &profile(&[]));
    let after_q1 = engine.evaluate(&answers(&[("Q1", AnswerToken::Yes)]), &profile(&[]));
    let after_both = engine.evaluate(
        &answers(&[("Q1", AnswerToken::Yes), ("Q2", AnswerToken::Partial)]),
        &profile(&[]),
    );

    assert!(resolved_count(&after_q1) >= resolved_count(&empty));
    assert!(resolved_count(&after_both) >= resolved_count(&after_q1));
    assert!(after_both.pending_question_ids.len() <= after_q1.pending_question_ids.len());

    // A question that resolved never returns to pending.
    assert_eq!(after_q1.per_question[0].status, QuestionStatus::Active);
    assert_eq!(after_both.per_question[0].status, QuestionStatus::Active);
    assert_eq!(after_both.per_question[1].status, QuestionStatus::Active);
}

#[test]
fn answer_outside_question_options_is_recovered() {
    // Q2 of the pet schema offers an `na` option; Q1 (5.1) does not. An `na`
    // answer on 5.1 is outside its options and must degrade to unanswered.
    let engine = engine(pet_schema());
    let report = engine.evaluate(
        &answers(&[("5.1", AnswerToken::Na)]),
        &profile(&[("pets.has_pets", true)]),
    );

    let q51 = &report.per_question[0];
    assert_eq!(q51.status, QuestionStatus::Active);
    assert_eq!(q51.answer, Some(AnswerToken::Na));
    assert_eq!(q51.score, None);
    assert!(q51.flags.contains(&QuestionFlag::InvalidAnswer));
    assert_eq!(report.flags_summary.invalid_answer, 1);

    // Recovery keeps the run alive and the question unresolved.
    assert!(report.pending_question_ids.contains(&"5.1".to_string()));
}

#[test]
fn exclusion_shifts_weight_denominator_only_when_active() {
    let engine = engine(two_question_schema());

    // Both questions scored: denominator covers both weights.
    let both = engine.evaluate(
        &answers(&[("Q1", AnswerToken::Yes), ("Q2", AnswerToken::No)]),
        &profile(&[]),
    );
    assert_eq!(both.sections[0].score, Some(50.0));

    // Q2 system-NA: its weight leaves the denominator entirely.
    let gated_out = engine.evaluate(&answers(&[("Q1", AnswerToken::No)]), &profile(&[]));
    assert_eq!(gated_out.sections[0].score, Some(0.0));
}

#[test]
fn hidden_questions_carry_no_flags_and_no_score() {
    let mut schema = two_question_schema();
    schema.questions[1] = Question {
        system_na: false,
        ..schema.questions[1].clone()
    };

    let engine = engine(schema);
    let report = engine.evaluate(&answers(&[("Q1", AnswerToken::No)]), &profile(&[]));

    let q2 = &report.per_question[1];
    assert_eq!(q2.status, QuestionStatus::Hidden);
    assert_eq!(q2.answer, None);
    assert!(q2.flags.is_empty());
    assert_eq!(report.flags_summary.not_applicable, 0);
    assert!(report.is_fully_resolved());
}

#[test]
fn empty_answer_set_still_produces_report() {
    let engine = engine(two_question_schema());
    let report = engine.evaluate(&answers(&[]), &profile(&[]));

    assert_eq!(report.overall_score, 0.0);
    assert_eq!(report.sections[0].score, None);
    assert_eq!(report.dimensions[0].score, None);
    assert!(!report.band_label.is_empty());
    assert_eq!(
        report.pending_question_ids,
        vec!["Q1".to_string(), "Q2".to_string()]
    );
}

#[test]
fn section_progress_counts_active_and_pending_questions() {
    let engine = engine(two_question_schema());
    let report = engine.evaluate(&answers(&[("Q1", AnswerToken::Yes)]), &profile(&[]));

    let section = &report.sections[0];
    assert_eq!(section.questions_total, 2);
    assert_eq!(section.questions_answered, 1);
    assert!((section.progress - 0.5).abs() < 1e-9);
}
