//! User request handlers.
//!
//! Handlers are generic over the user repository so the router can be built
//! against PostgreSQL in production and against an in-memory store in tests.

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::warn;

use crate::api::dto::{LoginRequest, MessageResponse, UserRequest, UserResponse};
use crate::api::extract::{IdPath, JsonBody};
use crate::error::AppError;
use crate::models::User;
use crate::repositories::Repository;
use crate::services::INVALID_CREDENTIALS;
use crate::state::AppState;

/// Header carrying the number of records in a list response.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Creates user-related routes.
///
/// Routes:
/// - POST /register  - Register a new user
/// - GET /           - List all users
/// - PUT /{id}       - Replace user by ID
/// - DELETE /{id}    - Soft-delete user by ID
/// - POST /login     - Check credentials, answer with the user ID
pub fn user_routes<R: Repository<User>>() -> Router<AppState<R>> {
    Router::new()
        .route("/", get(list_users::<R>))
        .route("/register", post(register_user::<R>))
        .route("/login", post(login::<R>))
        .route("/{id}", put(update_user::<R>).delete(delete_user::<R>))
}

/// POST /user/register - Register a new user
///
/// Returns 201 Created with the stored user.
async fn register_user<R: Repository<User>>(
    State(state): State<AppState<R>>,
    JsonBody(payload): JsonBody<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state
        .services
        .users
        .create_user(payload.into_user())
        .await
        .inspect_err(|err| warn!(error = %err, "Registering user failed"))?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /user - List all users (also mounted at `/user/`)
///
/// Returns every live user and the count in `X-Total-Count`.
pub(crate) async fn list_users<R: Repository<User>>(
    State(state): State<AppState<R>>,
) -> Result<([(HeaderName, HeaderValue); 1], Json<Vec<UserResponse>>), AppError> {
    let (users, total) = state
        .services
        .users
        .list_users()
        .await
        .inspect_err(|err| warn!(error = %err, "Listing users failed"))?;
    let responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok((
        [(HeaderName::from_static(TOTAL_COUNT_HEADER), HeaderValue::from(total))],
        Json(responses),
    ))
}

/// PUT /user/{id} - Replace user
///
/// Returns the updated user.
async fn update_user<R: Repository<User>>(
    State(state): State<AppState<R>>,
    IdPath(id): IdPath,
    JsonBody(payload): JsonBody<UserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .services
        .users
        .update_user(id, payload.into_user())
        .await
        .inspect_err(|err| warn!(user_id = id, error = %err, "Updating user failed"))?;
    Ok(Json(UserResponse::from(user)))
}

/// DELETE /user/{id} - Soft-delete user
async fn delete_user<R: Repository<User>>(
    State(state): State<AppState<R>>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .services
        .users
        .delete_user(id)
        .await
        .inspect_err(|err| warn!(user_id = id, error = %err, "Deleting user failed"))?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// POST /user/login - Check credentials
///
/// Answers with the bare numeric user ID. Every failure, including a
/// malformed body and infrastructure errors, yields the same 400 response.
async fn login<R: Repository<User>>(
    State(state): State<AppState<R>>,
    payload: Result<JsonBody<LoginRequest>, AppError>,
) -> Result<Json<i32>, AppError> {
    let attempt = match payload {
        Ok(JsonBody(credentials)) => {
            state
                .services
                .users
                .authenticate(&credentials.username, &credentials.password)
                .await
        }
        Err(err) => Err(err),
    };

    attempt.map(Json).map_err(|err| {
        warn!(error = %err, "Login failed");
        AppError::bad_request(INVALID_CREDENTIALS)
    })
}
