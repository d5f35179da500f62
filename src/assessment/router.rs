use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::context::{AnswerSet, ProfileFacts};
use super::repository::{RunId, RunStore, StoreError};
use super::service::{AssessmentService, AssessmentServiceError};

/// One evaluation request: the caller's answer and profile snapshots.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub answers: AnswerSet,
    #[serde(default)]
    pub profile: ProfileFacts,
}

/// Router builder exposing HTTP endpoints for evaluation and run retrieval.
pub fn assessment_router<R>(service: Arc<AssessmentService<R>>) -> Router
where
    R: RunStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments/evaluate",
            post(evaluate_handler::<R>),
        )
        .route(
            "/api/v1/assessments/runs/:run_id",
            get(run_handler::<R>),
        )
        .route(
            "/api/v1/assessments/improvements",
            post(improvements_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    R: RunStore + 'static,
{
    match service.evaluate(&request.answers, &request.profile) {
        Ok(record) => (StatusCode::ACCEPTED, axum::Json(record)).into_response(),
        Err(AssessmentServiceError::Store(StoreError::Conflict)) => {
            let payload = json!({ "error": "run already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn run_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(run_id): Path<String>,
) -> Response
where
    R: RunStore + 'static,
{
    let id = RunId(run_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(AssessmentServiceError::Store(StoreError::NotFound)) => {
            let payload = json!({
                "run_id": id.0,
                "error": "run not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn improvements_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    R: RunStore + 'static,
{
    let items = service.improvements(&request.answers, &request.profile);
    (StatusCode::OK, axum::Json(items)).into_response()
}
