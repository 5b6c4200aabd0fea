//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories and handlers.

mod user_service;

pub use user_service::{UserService, INVALID_CREDENTIALS};

use crate::models::User;
use crate::repositories::{Repository, UserRepository};

/// Aggregates all services for convenient access.
///
/// This struct is designed to be used as Axum application state.
/// Cloning is cheap since underlying pools use `Arc` internally.
#[derive(Clone)]
pub struct Services<R = UserRepository> {
    pub users: UserService<R>,
}

impl<R: Repository<User>> Services<R> {
    /// Creates a new Services instance over the given user repository.
    pub fn new(users: R) -> Self {
        Self {
            users: UserService::new(users),
        }
    }
}
