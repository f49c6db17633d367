//! Schedule endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::CacheError;
use crate::positions::Navigation;
use crate::render::{render_week, split_message, MAX_MESSAGE_CHARS};
use crate::schedule::{ScrapeErrorKind, ScrapeResult, Scope};
use crate::server::types::ApiErrorType;
use crate::service::Fetched;
use crate::types::TimetableState;
use crate::users::{Profile, ALL_WEEKS_COMMAND};

#[derive(Debug, Deserialize)]
pub struct ScheduleQueryParams {
    /// If true, bypass cache and scrape fresh data
    #[serde(default)]
    pub refresh: bool,
    /// Requesting user, recorded in the request log when given
    #[serde(default)]
    pub user: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WeekQueryParams {
    pub user: i64,
    #[serde(default)]
    pub nav: Navigation,
}

/// Group names are matched against the site's upper-case labels.
pub(super) fn normalize_group(group: &str) -> String {
    group.trim().to_uppercase()
}

async fn fetch(
    state: &TimetableState,
    group: &str,
    refresh: bool,
) -> Result<Fetched, CacheError> {
    if refresh {
        Ok(state.service.refresh(group, Scope::AllWeeks).await)
    } else {
        state.service.get_or_scrape(group).await
    }
}

/// Registers the user on first sight and logs the command. Failures here never
/// fail the request.
fn record_request(state: &TimetableState, user: i64, command: &str, group: &str) {
    if let Err(e) = state.users.get_or_create_user(user, &Profile::default()) {
        warn!(user, error = %e, "Failed to register user");
        return;
    }
    if let Err(e) = state.users.log_request(user, command, Some(group)) {
        warn!(user, command, error = %e, "Failed to log request");
    }
}

fn cache_error_to_response(e: CacheError) -> Response {
    error!("Schedule cache failure: {}", e);
    ApiErrorType::from((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Schedule cache unavailable",
        Some(e.to_string()),
    ))
    .into_response()
}

/// Failed scrapes are reported with their category so clients can tell a
/// typo from an outage.
fn failed_scrape_to_response(result: &ScrapeResult) -> Response {
    let status = match result.error_kind {
        Some(ScrapeErrorKind::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };

    (
        status,
        Json(json!({
            "error": "Could not load schedule",
            "context": result.error,
            "error_kind": result.error_kind,
            "group_name": result.group_name,
        })),
    )
        .into_response()
}

/// GET /schedule/:group
///
/// Returns every scraped week of a group.
///
/// Query parameters:
/// - `refresh` (optional): Set to `true` to bypass cache
pub async fn get_schedule(
    Path(group): Path<String>,
    Query(params): Query<ScheduleQueryParams>,
    State(s): State<Arc<TimetableState>>,
) -> Response {
    let group = normalize_group(&group);
    info!("GET /schedule/{} (refresh={})", group, params.refresh);

    if let Some(user) = params.user {
        record_request(&s, user, ALL_WEEKS_COMMAND, &group);
    }

    let fetched = match fetch(&s, &group, params.refresh).await {
        Ok(fetched) => fetched,
        Err(e) => return cache_error_to_response(e),
    };

    if !fetched.result.success {
        warn!(group = %group, error = ?fetched.result.error, "Schedule unavailable");
        return failed_scrape_to_response(&fetched.result);
    }

    (
        StatusCode::OK,
        Json(json!({
            "source": fetched.source,
            "schedule": fetched.result,
        })),
    )
        .into_response()
}

/// GET /schedule/:group/week?user=<id>&nav=current|next|prev
///
/// Moves the user's week position and returns that week, rendered as text
/// chunks that fit a chat message.
pub async fn get_week(
    Path(group): Path<String>,
    Query(params): Query<WeekQueryParams>,
    State(s): State<Arc<TimetableState>>,
) -> Response {
    let group = normalize_group(&group);
    info!("GET /schedule/{}/week (user={}, nav={:?})", group, params.user, params.nav);

    week_response(&s, params.user, &group, params.nav).await
}

/// Logs the move, shifts the user's position and renders the week there.
pub(super) async fn week_response(
    s: &TimetableState,
    user: i64,
    group: &str,
    nav: Navigation,
) -> Response {
    record_request(s, user, nav.command(), group);

    let fetched = match fetch(s, group, false).await {
        Ok(fetched) => fetched,
        Err(e) => return cache_error_to_response(e),
    };

    if !fetched.result.success {
        return failed_scrape_to_response(&fetched.result);
    }

    let total_weeks = fetched.result.total_weeks();
    let week_index = s.positions.apply(user, group, nav, total_weeks);
    let week = fetched.result.week(week_index).cloned().unwrap_or_default();

    let text = format!(
        "Schedule for group {}\nWeek {} of {}\n\n{}",
        group,
        week_index + 1,
        total_weeks.max(1),
        render_week(&week)
    );

    (
        StatusCode::OK,
        Json(json!({
            "group_name": group,
            "source": fetched.source,
            "week_index": week_index,
            "total_weeks": total_weeks,
            "lessons": week,
            "text_parts": split_message(&text, MAX_MESSAGE_CHARS),
        })),
    )
        .into_response()
}
