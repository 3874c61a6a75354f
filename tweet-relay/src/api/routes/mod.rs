pub mod health;

use axum::Router;

use crate::api::server::AppState;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", axum::routing::get(health::status))
        .nest("/health", health::router())
        .with_state(state)
}
