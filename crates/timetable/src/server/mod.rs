use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;

use crate::server::endpoints::{schedule, status, users};
use crate::types::TimetableState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<TimetableState>) -> Router {
    let schedule_router = Router::new()
        .route("/schedule/:group", get(schedule::get_schedule))
        .route("/schedule/:group/week", get(schedule::get_week));

    let users_router = Router::new()
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/group", put(users::put_group))
        .route("/users/:id/week", get(users::get_saved_week));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/cache/stats", get(status::get_cache_stats))
        .merge(schedule_router)
        .merge(users_router)
        .with_state(app_state)
}
