use async_trait::async_trait;

use super::query::QueryOption;
use super::unit_of_work::UnitOfWorkFactory;
use crate::error::AppResult;
use crate::models::{Audited, Entity};

/// Generic data access over one entity type.
///
/// Every operation except [`Repository::exists`] runs inside the caller's
/// unit of work. Reads see live records only unless [`QueryOption::Unscoped`]
/// is passed, and results are ordered by ascending key.
#[async_trait]
pub trait Repository<E: Entity + Audited>: UnitOfWorkFactory {
    /// Inserts `entity`, stamping both audit timestamps and writing the
    /// assigned key back into it.
    async fn add(&self, uow: &mut Self::Uow, entity: &mut E) -> AppResult<()>;

    /// Every matching record plus the total count.
    async fn get_all(
        &self,
        uow: &mut Self::Uow,
        options: &[QueryOption<E>],
    ) -> AppResult<(Vec<E>, i64)>;

    /// Loads the record with `key` into `out`, honouring column selection.
    /// Fails with `NotFound` when no live record matches.
    async fn get_one(
        &self,
        uow: &mut Self::Uow,
        key: E::Key,
        out: &mut E,
        options: &[QueryOption<E>],
    ) -> AppResult<()>;

    /// The first matching record. Fails with `NotFound` when none matches.
    async fn first(&self, uow: &mut Self::Uow, options: &[QueryOption<E>]) -> AppResult<E>;

    /// Rewrites every column of the live record with `entity`'s key and
    /// refreshes `updated_at`. Fails with `NotFound` when no live record has
    /// that key.
    async fn save(&self, uow: &mut Self::Uow, entity: &mut E) -> AppResult<()>;

    /// Writes only `fields` on the record with `entity`'s key, further
    /// restricted by `options`. Returns the number of affected records.
    async fn update_with_map(
        &self,
        uow: &mut Self::Uow,
        entity: &E,
        fields: &[E::Field],
        options: &[QueryOption<E>],
    ) -> AppResult<usize>;

    /// Whether a matching record with `key` exists. Runs outside any unit of
    /// work.
    async fn exists(&self, key: E::Key, options: &[QueryOption<E>]) -> AppResult<bool>;
}
