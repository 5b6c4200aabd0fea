//! Top-level router assembly.

use axum::{Router, middleware, routing::get};

use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::models::User;
use crate::repositories::Repository;
use crate::state::AppState;

/// Builds the application router over `state`.
///
/// Layers run outermost-last-added: `request_id_middleware` assigns the id
/// before `logging_middleware` opens the request span that records it.
pub fn create_router<R: Repository<User>>(state: AppState<R>) -> Router {
    Router::new()
        .nest("/user", handlers::users::user_routes::<R>())
        // A nested "/" only answers the bare prefix.
        .route("/user/", get(handlers::users::list_users::<R>))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
