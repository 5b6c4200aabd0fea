//! Repository layer for data access operations.
//!
//! Repositories are generic over [`crate::models::Entity`] and run inside a
//! caller-owned [`UnitOfWork`]; the PostgreSQL implementations live next to
//! the traits.

#[cfg(test)]
pub mod memory;
mod query;
mod repository;
mod unit_of_work;
mod user_repo;

pub use query::{QueryOption, QueryPlan};
pub use repository::Repository;
pub use unit_of_work::{PgUnitOfWork, UnitOfWork, UnitOfWorkFactory, UowStatus};
pub use user_repo::UserRepository;

use crate::db::AsyncDbPool;

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
}

impl Repositories {
    /// Creates a new Repositories instance with all repositories initialized.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }
}
