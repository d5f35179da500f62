use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::RunReport;

/// Identifier wrapper for stored evaluation runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

/// Stored envelope around one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub evaluated_at: DateTime<Utc>,
    pub report: RunReport,
}

impl RunRecord {
    pub fn summary_view(&self) -> RunSummaryView {
        RunSummaryView {
            run_id: self.run_id.clone(),
            evaluated_at: self.evaluated_at,
            overall_score: self.report.overall_score,
            band_label: self.report.band_label.clone(),
            pending_questions: self.report.pending_question_ids.len(),
            fully_resolved: self.report.is_fully_resolved(),
        }
    }
}

/// Compact view of a stored run for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummaryView {
    pub run_id: RunId,
    pub evaluated_at: DateTime<Utc>,
    pub overall_score: f64,
    pub band_label: String,
    pub pending_questions: usize,
    pub fully_resolved: bool,
}

/// Storage abstraction so the service can be exercised in isolation; the
/// engine itself never persists anything.
pub trait RunStore: Send + Sync {
    fn insert(&self, record: RunRecord) -> Result<RunRecord, StoreError>;
    fn fetch(&self, id: &RunId) -> Result<Option<RunRecord>, StoreError>;
    fn latest(&self) -> Result<Option<RunRecord>, StoreError>;
}

/// Error enumeration for run storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("run already exists")]
    Conflict,
    #[error("run not found")]
    NotFound,
    #[error("run store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store backing the demo server and tests.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    records: Mutex<BTreeMap<String, RunRecord>>,
    order: Mutex<Vec<String>>,
}

impl RunStore for InMemoryRunStore {
    fn insert(&self, record: RunRecord) -> Result<RunRecord, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?;
        if records.contains_key(&record.run_id.0) {
            return Err(StoreError::Conflict);
        }
        records.insert(record.run_id.0.clone(), record.clone());
        self.order
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?
            .push(record.run_id.0.clone());
        Ok(record)
    }

    fn fetch(&self, id: &RunId) -> Result<Option<RunRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?;
        Ok(records.get(&id.0).cloned())
    }

    fn latest(&self) -> Result<Option<RunRecord>, StoreError> {
        let order = self
            .order
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?;
        let Some(last) = order.last() else {
            return Ok(None);
        };
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?;
        Ok(records.get(last).cloned())
    }
}
