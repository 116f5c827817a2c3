//! HTTP surface of the Mockview server.
//!
//! Thin translation layer: handlers parse the request, delegate to the run
//! controller or the interview repository, and map domain errors to status
//! codes. No session logic lives here.
//!
//! The caller's identity arrives in the `x-user-id` header, verified by an
//! upstream proxy; requests without it are rejected with 401.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use mockview_application::RunController;
use mockview_core::error::MockviewError;
use mockview_core::interview::{Interview, InterviewRepository, InterviewUpdate};
use mockview_core::session::TurnStore;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub controller: Arc<RunController>,
    pub interviews: Arc<dyn InterviewRepository>,
    pub turn_store: Arc<dyn TurnStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/interviews",
            post(create_interview).get(list_interviews),
        )
        .route(
            "/api/interviews/{id}",
            get(get_interview)
                .put(update_interview)
                .delete(delete_interview),
        )
        .route("/api/interviews/{id}/start", post(start_run))
        .route("/api/interviews/{id}/messages", post(submit_answer))
        .route("/api/interviews/{id}/end", post(end_run))
        .route("/api/interviews/{id}/history", get(history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

enum ApiError {
    Unauthorized,
    Domain(MockviewError),
}

impl From<MockviewError> for ApiError {
    fn from(err: MockviewError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or empty x-user-id header".to_string(),
            ),
            ApiError::Domain(err) => {
                let (status, code) = match &err {
                    MockviewError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                    MockviewError::RunTerminated { .. } => {
                        (StatusCode::CONFLICT, "run_terminated")
                    }
                    MockviewError::OutOfTurn { .. } => (StatusCode::CONFLICT, "out_of_turn"),
                    MockviewError::GenerationFailed(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "generation_failed")
                    }
                    MockviewError::Validation(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "validation")
                    }
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
                };
                if status.is_server_error() {
                    tracing::error!(target: "http", "Request failed: {}", err);
                    // Internal details stay in the log.
                    (status, code, "internal server error".to_string())
                } else {
                    (status, code, err.to_string())
                }
            }
        };
        (
            status,
            Json(json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn owner_id(headers: &HeaderMap) -> ApiResult<&str> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Unauthorized)
}

#[derive(Deserialize)]
struct CreateInterviewRequest {
    title: String,
    duration_minutes: u32,
    job_description: Option<String>,
    cv_summary: Option<String>,
}

async fn create_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateInterviewRequest>,
) -> ApiResult<(StatusCode, Json<Interview>)> {
    let owner = owner_id(&headers)?;
    let mut interview = Interview::new(owner, request.title, request.duration_minutes)?;
    interview.job_description = request.job_description;
    interview.cv_summary = request.cv_summary;
    state.interviews.save(&interview).await?;
    tracing::info!(target: "http", "Created interview {}", interview.id);
    Ok((StatusCode::CREATED, Json(interview)))
}

async fn list_interviews(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Interview>>> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.interviews.list_by_owner(owner).await?))
}

async fn get_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Interview>> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.controller.require_interview(owner, &id).await?))
}

async fn update_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<InterviewUpdate>,
) -> ApiResult<Json<Interview>> {
    let owner = owner_id(&headers)?;
    let mut interview = state.controller.require_interview(owner, &id).await?;
    interview.apply(update)?;
    state.interviews.save(&interview).await?;
    Ok(Json(interview))
}

async fn delete_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let owner = owner_id(&headers)?;
    state.controller.require_interview(owner, &id).await?;
    // Interview record first: if turn cleanup fails midway, the orphaned
    // runs are unreachable and a retried delete can still find them.
    state.interviews.delete(&id).await?;
    state.turn_store.delete_by_interview(&id).await?;
    tracing::info!(target: "http", "Deleted interview {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn start_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.controller.start(owner, &id).await?))
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
    session_run_id: Option<String>,
}

async fn submit_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let outcome = state
        .controller
        .submit_answer(owner, &id, request.session_run_id.as_deref(), &request.text)
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize, Default)]
struct EndRequest {
    session_run_id: Option<String>,
}

async fn end_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<EndRequest>>,
) -> ApiResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let outcome = state
        .controller
        .end(owner, &id, request.session_run_id.as_deref())
        .await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct HistoryQuery {
    session_run_id: Option<String>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let view = state
        .controller
        .history(owner, &id, query.session_run_id.as_deref())
        .await?;
    Ok(Json(view))
}
