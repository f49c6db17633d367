use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::server::types::ApiErrorType;
use crate::types::TimetableState;

/// GET /health
pub async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// GET /cache/stats
///
/// Returns entry counts of the schedule cache, split by freshness.
pub async fn get_cache_stats(State(s): State<Arc<TimetableState>>) -> Response {
    match s.service.cache().stats() {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "total_entries": stats.total_entries,
                "fresh_entries": stats.fresh_entries,
                "stale_entries": stats.stale_entries,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to read cache stats: {}", e);
            ApiErrorType::from((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read cache stats",
                Some(e.to_string()),
            ))
            .into_response()
        }
    }
}
