use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use rivalscope_common::{AnalyzeRequest, EnhancedCompetitorData, ReportRecord, RivalScopeError};
use rivalscope_engine::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
}

pub fn build_router(service: Arc<ReportService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/reports", post(create_report).get(list_reports))
        .route("/api/reports/{id}", get(get_report))
        .route("/api/reports/{id}/enhanced", get(get_enhanced))
        .route("/ws", get(crate::ws::ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
pub struct CreateReportBody {
    pub user_id: String,
    /// Open stream session to receive progress events, if any.
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub request: AnalyzeRequest,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct EnhancedResponse {
    payload: Vec<EnhancedCompetitorData>,
    stale: bool,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: String,
    pub limit: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// A request either returns a best-effort report or one clear failure.
/// Unexpected internals collapse to a generic message.
fn error_response(err: RivalScopeError) -> ApiError {
    let status = match &err {
        RivalScopeError::EmptyCompetitorSet | RivalScopeError::Validation(_) => {
            StatusCode::BAD_REQUEST
        }
        RivalScopeError::ReportNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &err {
        RivalScopeError::Anyhow(_) => "Internal error".to_string(),
        other => other.to_string(),
    };
    tracing::warn!(error = %err, "Request failed");
    (status, Json(ErrorBody { error: message }))
}

async fn create_report(
    State(state): State<AppState>,
    Json(body): Json<CreateReportBody>,
) -> Result<Json<ReportRecord>, ApiError> {
    let record = state
        .service
        .run_report(&body.request, &body.user_id, body.session_id.as_deref())
        .await
        .map_err(error_response)?;
    Ok(Json(record))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportRecord>, ApiError> {
    let record = state
        .service
        .get_report(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(RivalScopeError::ReportNotFound(id)))?;
    Ok(Json(record))
}

async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    let records = state
        .service
        .list_reports(&params.user_id, params.limit.unwrap_or(20))
        .await
        .map_err(error_response)?;
    Ok(Json(records))
}

async fn get_enhanced(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let read = state
        .service
        .get_enhanced(id)
        .await
        .map_err(error_response)?;
    Ok(Json(EnhancedResponse {
        payload: read.payload,
        stale: read.stale,
        last_updated: read.last_updated,
    }))
}

async fn health() -> &'static str {
    "ok"
}
