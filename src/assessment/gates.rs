//! Gate resolution: profile gates first, then soft gates.
//!
//! Both gate families are declarative rules re-evaluated fresh on every pass;
//! no incremental state is carried between passes.

use super::context::{AnswerSet, ProfileFacts};
use super::expr::Tri;
use super::schema::{GateResult, QuestionFlag};
use super::validate::CompiledSchema;

/// Per-question gate outcome.
///
/// `ForcedNa` marks the question not-applicable with a reportable flag. `Ask`
/// means the question may be presented. `Pending` means the gate's predicate
/// depends on answers that have not arrived yet; the question must neither be
/// shown nor scored as NA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    ForcedNa { flag: QuestionFlag },
    Ask,
    Pending,
}

/// Resolve gate outcomes for every question, aligned with question order.
pub(crate) fn resolve_gates(
    schema: &CompiledSchema,
    answers: &AnswerSet,
    profile: &ProfileFacts,
) -> Vec<GateStatus> {
    // Each gate predicate is evaluated once per pass, not once per target.
    let profile_gate_results: Vec<Tri> = schema
        .profile_gates()
        .iter()
        .map(|gate| gate.when.evaluate(answers, profile))
        .collect();
    let soft_gate_results: Vec<Tri> = schema
        .soft_gates()
        .iter()
        .map(|gate| gate.when.evaluate(answers, profile))
        .collect();

    (0..schema.schema().questions.len())
        .map(|question_position| {
            resolve_question(
                schema,
                question_position,
                &profile_gate_results,
                &soft_gate_results,
            )
        })
        .collect()
}

fn resolve_question(
    schema: &CompiledSchema,
    question_position: usize,
    profile_gate_results: &[Tri],
    soft_gate_results: &[Tri],
) -> GateStatus {
    // Profile-level exclusion is authoritative and wins over any soft gate.
    for gate_position in schema.profile_gates_for(question_position) {
        if profile_gate_results[*gate_position] == Tri::True {
            let gate = &schema.profile_gates()[*gate_position];
            return GateStatus::ForcedNa {
                flag: gate.flag.unwrap_or(QuestionFlag::NotApplicable),
            };
        }
    }

    let covering = schema.soft_gates_for(question_position);
    if covering.is_empty() {
        return GateStatus::Ask;
    }

    // An `na` rule firing means the opposite predicate is definitively true,
    // not merely unanswered; it outranks a simultaneous `ask`.
    for gate_position in covering {
        let gate = &schema.soft_gates()[*gate_position];
        if gate.result == GateResult::Na && soft_gate_results[*gate_position] == Tri::True {
            return GateStatus::ForcedNa {
                flag: gate.flag.unwrap_or(QuestionFlag::FollowUp),
            };
        }
    }

    for gate_position in covering {
        let gate = &schema.soft_gates()[*gate_position];
        if gate.result == GateResult::Ask && soft_gate_results[*gate_position] == Tri::True {
            return GateStatus::Ask;
        }
    }

    GateStatus::Pending
}
