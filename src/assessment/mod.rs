//! Conditional assessment evaluation and scoring.
//!
//! A schema document describes dimensions, weighted sections, questions with
//! `applies_if` predicates, and gate rules. Given that schema plus a snapshot
//! of answers and profile facts, the engine resolves each question to one of
//! four statuses (`hidden`, `na_system`, `pending`, `active`), scores the
//! active answered questions, and aggregates weighted readiness scores per
//! section, dimension, and overall, classified into a labeled band.

pub mod applicability;
pub mod context;
pub mod engine;
pub mod expr;
pub mod gates;
pub mod loader;
pub mod report;
pub mod repository;
pub mod router;
pub mod schema;
pub(crate) mod scoring;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests;

pub use applicability::QuestionStatus;
pub use context::{AnswerSet, ProfileFacts};
pub use engine::AssessmentEngine;
pub use expr::{Expr, PredicateParseError, Tri};
pub use loader::{load_engine, load_schema, SchemaLoadError};
pub use report::{
    DimensionReport, FlagsSummary, ImprovementItem, ImprovementOption, ImprovementPriority,
    QuestionReport, RunReport, SectionReport,
};
pub use repository::{
    InMemoryRunStore, RunId, RunRecord, RunStore, RunSummaryView, StoreError,
};
pub use router::{assessment_router, EvaluationRequest};
pub use schema::{
    AnswerOption, AnswerToken, AssessmentSchema, Dimension, FlagRules, GateResult, GateRule,
    ProfileOption, ProfileQuestion, Question, QuestionFlag, ScoreBand, Section,
};
pub use service::{AssessmentService, AssessmentServiceError};
pub use validate::{CompiledSchema, SchemaValidationError};
