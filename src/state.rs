//! Application state for Axum web framework.
//!
//! Contains shared services that are accessible across all request handlers.

use crate::db::AsyncDbPool;
use crate::repositories::{Repositories, UserRepository};
use crate::services::Services;

/// Application state containing all shared services.
///
/// Generic over the user repository; production code uses the default
/// PostgreSQL-backed [`UserRepository`]. Cloning is cheap since the
/// repositories only hold pool handles.
#[derive(Clone)]
pub struct AppState<R = UserRepository> {
    /// All business logic services
    pub services: Services<R>,
}

impl AppState {
    /// Creates a new AppState from a database connection pool.
    ///
    /// Initializes all repositories and services from the provided pool.
    pub fn new(pool: AsyncDbPool) -> Self {
        let repos = Repositories::new(pool);
        Self::with_services(Services::new(repos.users))
    }
}

impl<R> AppState<R> {
    /// Wraps already-built services.
    pub fn with_services(services: Services<R>) -> Self {
        Self { services }
    }
}
