//! Evaluation and scoring engine for conditional readiness assessments.
//!
//! The [`assessment`] module is a pure computation library: given an immutable
//! questionnaire schema, a set of recorded answers, and a profile fact set, it
//! resolves gate and applicability states per question and aggregates weighted
//! readiness scores into a run report. The surrounding modules provide the
//! service shell (configuration, telemetry, HTTP error mapping) used by the
//! `readiness-engine` binary.

pub mod assessment;
pub mod config;
pub mod error;
pub mod telemetry;
