//! Assessment run orchestration.
//!
//! Construction validates and compiles the schema once; after that every
//! evaluation is a pure, synchronous pass over the caller's answer and
//! profile snapshots. The engine holds no per-run state, so a single engine
//! value can serve any number of concurrent runs.

use super::applicability::{self, QuestionStatus};
use super::context::{AnswerSet, ProfileFacts};
use super::gates;
use super::report::{FlagsSummary, ImprovementItem, QuestionReport, RunReport};
use super::schema::{AssessmentSchema, QuestionFlag};
use super::scoring::{self, ScoredQuestion};
use super::validate::{CompiledSchema, SchemaValidationError};

/// Stateless evaluator for one schema version.
pub struct AssessmentEngine {
    schema: CompiledSchema,
}

impl AssessmentEngine {
    /// Validate and compile the schema. An invalid schema never yields an
    /// engine, so no run can observe a malformed document.
    pub fn new(schema: AssessmentSchema) -> Result<Self, SchemaValidationError> {
        CompiledSchema::compile(schema).map(|schema| Self { schema })
    }

    pub fn schema(&self) -> &AssessmentSchema {
        self.schema.schema()
    }

    /// Run one evaluation pass: gates, applicability, per-question scoring,
    /// aggregation, band classification.
    ///
    /// Re-entrant by construction; the report is a pure function of
    /// `(schema, answers, profile)`.
    pub fn evaluate(&self, answers: &AnswerSet, profile: &ProfileFacts) -> RunReport {
        let scored = self.resolve_questions(answers, profile);
        let document = self.schema.schema();

        let mut per_question = Vec::with_capacity(scored.len());
        let mut pending_question_ids = Vec::new();
        let mut flags_summary = FlagsSummary::default();
        for (question, resolution) in document.questions.iter().zip(&scored) {
            if is_unresolved(resolution) {
                pending_question_ids.push(question.id.clone());
            }
            for flag in &resolution.flags {
                flags_summary.count(*flag);
            }
            per_question.push(QuestionReport {
                id: question.id.clone(),
                status: resolution.status,
                answer: resolution.answer,
                score: resolution.fraction,
                flags: resolution.flags.clone(),
            });
        }

        let (sections, dimensions, overall_score) = scoring::aggregate(&self.schema, &scored);
        let band_label = scoring::band_for(&document.score_bands, overall_score)
            .map(|band| band.label.clone())
            .unwrap_or_default();

        RunReport {
            assessment_id: document.assessment_id.clone(),
            version: document.version.clone(),
            per_question,
            sections,
            dimensions,
            overall_score,
            band_label,
            pending_question_ids,
            flags_summary,
        }
    }

    /// Ranked list of answered questions with remaining score headroom.
    pub fn improvement_items(
        &self,
        answers: &AnswerSet,
        profile: &ProfileFacts,
    ) -> Vec<ImprovementItem> {
        let scored = self.resolve_questions(answers, profile);
        scoring::improvement_items(&self.schema, &scored)
    }

    fn resolve_questions(&self, answers: &AnswerSet, profile: &ProfileFacts) -> Vec<ScoredQuestion> {
        let gate_statuses = gates::resolve_gates(&self.schema, answers, profile);
        let document = self.schema.schema();

        document
            .questions
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let applies = self.schema.applies_for(position).evaluate(answers, profile);
                let disposition = applicability::resolve(question, applies, gate_statuses[position]);
                scoring::score_question(document, question, disposition, answers)
            })
            .collect()
    }
}

/// A question still blocks full resolution while its applicability is
/// undecided or it awaits a usable answer.
fn is_unresolved(resolution: &ScoredQuestion) -> bool {
    match resolution.status {
        QuestionStatus::Pending => true,
        QuestionStatus::Active => {
            resolution.answer.is_none()
                || resolution.flags.contains(&QuestionFlag::InvalidAnswer)
        }
        QuestionStatus::Hidden | QuestionStatus::NaSystem => false,
    }
}
