use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::context::{AnswerSet, ProfileFacts};
use super::engine::AssessmentEngine;
use super::report::ImprovementItem;
use super::repository::{RunId, RunRecord, RunStore, StoreError};

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("run-{id:06}"))
}

/// Service composing the compiled engine with a run store.
///
/// The service adds only orchestration around the pure engine: id assignment,
/// timestamps, and persistence of the resulting report.
pub struct AssessmentService<R> {
    engine: Arc<AssessmentEngine>,
    store: Arc<R>,
}

impl<R> AssessmentService<R>
where
    R: RunStore + 'static,
{
    pub fn new(engine: Arc<AssessmentEngine>, store: Arc<R>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &AssessmentEngine {
        &self.engine
    }

    /// Evaluate a snapshot of answers and profile facts, persisting the
    /// resulting report.
    pub fn evaluate(
        &self,
        answers: &AnswerSet,
        profile: &ProfileFacts,
    ) -> Result<RunRecord, AssessmentServiceError> {
        let report = self.engine.evaluate(answers, profile);
        let record = RunRecord {
            run_id: next_run_id(),
            evaluated_at: Utc::now(),
            report,
        };
        let stored = self.store.insert(record)?;
        info!(
            run_id = %stored.run_id.0,
            overall_score = stored.report.overall_score,
            band = %stored.report.band_label,
            pending = stored.report.pending_question_ids.len(),
            "assessment run evaluated"
        );
        Ok(stored)
    }

    /// Fetch a previously stored run.
    pub fn get(&self, run_id: &RunId) -> Result<RunRecord, AssessmentServiceError> {
        let record = self.store.fetch(run_id)?.ok_or(StoreError::NotFound)?;
        Ok(record)
    }

    /// Ranked improvement items for a snapshot; nothing is persisted.
    pub fn improvements(
        &self,
        answers: &AnswerSet,
        profile: &ProfileFacts,
    ) -> Vec<ImprovementItem> {
        self.engine.improvement_items(answers, profile)
    }
}

/// Error raised by the assessment service facade.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
