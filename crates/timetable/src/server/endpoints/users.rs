//! User endpoints: saved group and request history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::positions::Navigation;
use crate::server::endpoints::schedule::{normalize_group, week_response};
use crate::server::types::ApiErrorType;
use crate::types::TimetableState;
use crate::users::{Profile, UserStoreError};

const RECENT_REQUESTS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SaveGroupBody {
    pub group: String,
}

#[derive(Debug, Deserialize)]
pub struct SavedWeekQueryParams {
    #[serde(default)]
    pub nav: Navigation,
}

fn store_error_to_response(e: UserStoreError) -> Response {
    error!("User store failure: {}", e);
    ApiErrorType::from((
        StatusCode::INTERNAL_SERVER_ERROR,
        "User store unavailable",
        Some(e.to_string()),
    ))
    .into_response()
}

/// GET /users/:id
///
/// Returns the user with their most recent requests.
pub async fn get_user(Path(id): Path<i64>, State(s): State<Arc<TimetableState>>) -> Response {
    info!("GET /users/{}", id);

    let user = match s.users.get_user(id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ApiErrorType::from((StatusCode::NOT_FOUND, "Unknown user", None))
                .into_response()
        }
        Err(e) => return store_error_to_response(e),
    };

    match s.users.recent_requests(id, RECENT_REQUESTS) {
        Ok(requests) => (
            StatusCode::OK,
            Json(json!({
                "user": user,
                "recent_requests": requests,
            })),
        )
            .into_response(),
        Err(e) => store_error_to_response(e),
    }
}

/// PUT /users/:id/group
///
/// Saves the group a user works with, registering the user if needed.
pub async fn put_group(
    Path(id): Path<i64>,
    State(s): State<Arc<TimetableState>>,
    Json(body): Json<SaveGroupBody>,
) -> Response {
    let group = normalize_group(&body.group);
    info!("PUT /users/{}/group ({})", id, group);

    if group.is_empty() {
        return ApiErrorType::from((StatusCode::BAD_REQUEST, "Group name is empty", None))
            .into_response();
    }

    let profile = Profile {
        group_name: Some(group),
        ..Default::default()
    };
    match s.users.get_or_create_user(id, &profile) {
        Ok(user) => (StatusCode::OK, Json(json!({ "user": user }))).into_response(),
        Err(e) => store_error_to_response(e),
    }
}

/// GET /users/:id/week?nav=current|next|prev
///
/// Same as `/schedule/:group/week` for the group the user saved.
pub async fn get_saved_week(
    Path(id): Path<i64>,
    Query(params): Query<SavedWeekQueryParams>,
    State(s): State<Arc<TimetableState>>,
) -> Response {
    info!("GET /users/{}/week (nav={:?})", id, params.nav);

    let group = match s.users.get_user(id) {
        Ok(user) => user.and_then(|user| user.group_name),
        Err(e) => return store_error_to_response(e),
    };

    let Some(group) = group else {
        return ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No group saved",
            Some(format!("user {id} has not saved a group")),
        ))
        .into_response();
    };

    week_response(&s, id, &group, params.nav).await
}
