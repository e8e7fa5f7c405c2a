//! API endpoints.

mod notifications;
mod reschedule;
mod sessions;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/reschedule", reschedule::router())
        .nest("/notifications", notifications::router())
        .nest("/users", users::router())
}
