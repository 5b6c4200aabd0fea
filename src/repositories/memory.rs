//! In-memory transactional store implementing the repository traits for any
//! entity. Backs service and HTTP tests without a database.
//!
//! A unit of work reads from a private snapshot of the table and records the
//! keys it writes; commit copies only those rows into the shared table,
//! rollback or drop throws them away. Keys come from a shared counter that,
//! like a Postgres sequence, is not rolled back.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::query::{QueryOption, QueryPlan};
use super::repository::Repository;
use super::unit_of_work::{terminated, UnitOfWork, UnitOfWorkFactory, UowStatus};
use crate::error::{AppError, AppResult};
use crate::models::{utc_now, Audited, Entity};

type UniqueKey<E> = (&'static str, fn(&E) -> String);

struct Table<E: Entity> {
    rows: BTreeMap<E::Key, E>,
    next_key: i32,
}

/// Shared in-memory table.
pub struct MemoryStore<E: Entity> {
    table: Arc<Mutex<Table<E>>>,
    unique: Vec<UniqueKey<E>>,
}

impl<E: Entity> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            unique: self.unique.clone(),
        }
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                rows: BTreeMap::new(),
                next_key: 1,
            })),
            unique: Vec::new(),
        }
    }

    /// Enforces uniqueness of `extract` among all rows, like a `UNIQUE`
    /// constraint on `field`.
    pub fn with_unique(mut self, field: &'static str, extract: fn(&E) -> String) -> Self {
        self.unique.push((field, extract));
        self
    }

    /// Committed rows, soft-deleted ones included.
    pub fn committed(&self) -> Vec<E> {
        self.table
            .lock()
            .expect("memory table poisoned")
            .rows
            .values()
            .cloned()
            .collect()
    }

    fn check_unique(&self, rows: &BTreeMap<E::Key, E>, candidate: &E) -> AppResult<()> {
        for (field, extract) in &self.unique {
            let value = extract(candidate);
            let clash = rows
                .values()
                .any(|row| row.key() != candidate.key() && extract(row) == value);
            if clash {
                return Err(AppError::Duplicate {
                    entity: E::NAME.to_string(),
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Unit of work over a [`MemoryStore`] snapshot.
pub struct MemoryUnitOfWork<E: Entity> {
    table: Arc<Mutex<Table<E>>>,
    snapshot: BTreeMap<E::Key, E>,
    written: BTreeSet<E::Key>,
    read_only: bool,
    status: UowStatus,
}

impl<E: Entity> MemoryUnitOfWork<E> {
    fn rows(&mut self) -> AppResult<&mut BTreeMap<E::Key, E>> {
        if self.status != UowStatus::Pending {
            return Err(terminated(self.status));
        }
        Ok(&mut self.snapshot)
    }

    fn mark_written(&mut self, key: E::Key) {
        self.written.insert(key);
    }
}

#[async_trait]
impl<E: Entity> UnitOfWork for MemoryUnitOfWork<E> {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn status(&self) -> UowStatus {
        self.status
    }

    async fn commit(&mut self) -> AppResult<()> {
        if self.status != UowStatus::Pending {
            return Err(terminated(self.status));
        }
        let mut table = self.table.lock().expect("memory table poisoned");
        for key in std::mem::take(&mut self.written) {
            if let Some(row) = self.snapshot.remove(&key) {
                table.rows.insert(key, row);
            }
        }
        self.snapshot.clear();
        self.status = UowStatus::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        if self.status == UowStatus::Pending {
            self.snapshot.clear();
            self.written.clear();
            self.status = UowStatus::RolledBack;
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> UnitOfWorkFactory for MemoryStore<E> {
    type Uow = MemoryUnitOfWork<E>;

    async fn begin(&self, read_only: bool) -> AppResult<MemoryUnitOfWork<E>> {
        let snapshot = self.table.lock().expect("memory table poisoned").rows.clone();
        Ok(MemoryUnitOfWork {
            table: Arc::clone(&self.table),
            snapshot,
            written: BTreeSet::new(),
            read_only,
            status: UowStatus::Pending,
        })
    }
}

#[async_trait]
impl<E> Repository<E> for MemoryStore<E>
where
    E: Entity + Audited,
    E::Key: From<i32>,
{
    async fn add(&self, uow: &mut MemoryUnitOfWork<E>, entity: &mut E) -> AppResult<()> {
        let rows = uow.rows()?;
        self.check_unique(rows, entity)?;

        let key = {
            let mut table = self.table.lock().expect("memory table poisoned");
            let key = table.next_key;
            table.next_key += 1;
            key
        };
        let now = utc_now();
        entity.set_key(E::Key::from(key));
        entity.set_created_at(now);
        entity.set_updated_at(now);
        rows.insert(entity.key(), entity.clone());
        uow.mark_written(entity.key());
        Ok(())
    }

    async fn get_all(
        &self,
        uow: &mut MemoryUnitOfWork<E>,
        options: &[QueryOption<E>],
    ) -> AppResult<(Vec<E>, i64)> {
        let plan = QueryPlan::new(options);
        let rows: Vec<E> = uow
            .rows()?
            .values()
            .filter(|row| plan.admits(row))
            .cloned()
            .collect();
        let total = rows.len() as i64;
        Ok((rows, total))
    }

    async fn get_one(
        &self,
        uow: &mut MemoryUnitOfWork<E>,
        key: E::Key,
        out: &mut E,
        options: &[QueryOption<E>],
    ) -> AppResult<()> {
        let plan = QueryPlan::new(options);
        let row = uow
            .rows()?
            .get(&key)
            .filter(|row| plan.admits(row))
            .ok_or_else(|| AppError::not_found(E::NAME, "id", key))?;
        plan.project(row, out);
        Ok(())
    }

    async fn first(&self, uow: &mut MemoryUnitOfWork<E>, options: &[QueryOption<E>]) -> AppResult<E> {
        let plan = QueryPlan::new(options);
        uow.rows()?
            .values()
            .find(|row| plan.admits(row))
            .cloned()
            .ok_or_else(|| AppError::not_found(E::NAME, "query", format!("{:?}", plan.filters)))
    }

    async fn save(&self, uow: &mut MemoryUnitOfWork<E>, entity: &mut E) -> AppResult<()> {
        let rows = uow.rows()?;
        let key = entity.key();
        let deleted_at = match rows.get(&key) {
            Some(row) if row.is_live() => row.deleted_at(),
            _ => return Err(AppError::not_found(E::NAME, "id", key)),
        };
        self.check_unique(rows, entity)?;

        entity.set_updated_at(utc_now());
        let mut stored = entity.clone();
        stored.set_deleted_at(deleted_at);
        rows.insert(key, stored);
        uow.mark_written(key);
        Ok(())
    }

    async fn update_with_map(
        &self,
        uow: &mut MemoryUnitOfWork<E>,
        entity: &E,
        fields: &[E::Field],
        options: &[QueryOption<E>],
    ) -> AppResult<usize> {
        let plan = QueryPlan::new(options);
        let rows = uow.rows()?;
        let Some(row) = rows.get_mut(&entity.key()).filter(|row| plan.admits(row)) else {
            return Ok(0);
        };

        let before = row.updated_at();
        for field in fields {
            row.apply_field(field);
        }
        if row.updated_at() == before {
            row.set_updated_at(utc_now());
        }
        uow.mark_written(entity.key());
        Ok(1)
    }

    async fn exists(&self, key: E::Key, options: &[QueryOption<E>]) -> AppResult<bool> {
        let plan = QueryPlan::new(options);
        let table = self.table.lock().expect("memory table poisoned");
        Ok(table.rows.get(&key).is_some_and(|row| plan.admits(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserColumn, UserField, UserFilter};

    fn store() -> MemoryStore<User> {
        MemoryStore::new().with_unique("username", |u: &User| u.username.clone())
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = store();
        let mut uow = store.begin(false).await.unwrap();
        let mut user = User::new("alice", "p1");
        store.add(&mut uow, &mut user).await.unwrap();
        assert_eq!(user.id, 1);
        assert!(store.committed().is_empty());

        uow.commit().await.unwrap();
        assert_eq!(uow.status(), UowStatus::Committed);
        assert_eq!(store.committed().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_writes() {
        let store = store();
        {
            let mut uow = store.begin(false).await.unwrap();
            store.add(&mut uow, &mut User::new("alice", "p1")).await.unwrap();
        }
        assert!(store.committed().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_is_idempotent_and_commit_after_terminal_fails() {
        let store = store();
        let mut uow = store.begin(true).await.unwrap();
        assert!(uow.is_read_only());

        uow.rollback().await.unwrap();
        uow.rollback().await.unwrap();
        assert_eq!(uow.status(), UowStatus::RolledBack);

        let err = uow.commit().await.unwrap_err();
        assert!(matches!(err, AppError::Transaction { .. }));
        assert!(store.get_all(&mut uow, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_unique_violation_reports_duplicate() {
        let store = store();
        let mut uow = store.begin(false).await.unwrap();
        store.add(&mut uow, &mut User::new("alice", "p1")).await.unwrap();

        let err = store
            .add(&mut uow, &mut User::new("alice", "p2"))
            .await
            .unwrap_err();
        match err {
            AppError::Duplicate { field, value, .. } => {
                assert_eq!(field, "username");
                assert_eq!(value, "alice");
            }
            other => panic!("Expected Duplicate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_need_unscoped() {
        let store = store();
        let mut uow = store.begin(false).await.unwrap();
        let mut user = User::new("alice", "p1");
        store.add(&mut uow, &mut user).await.unwrap();

        let affected = store
            .update_with_map(
                &mut uow,
                &user,
                &[UserField::DeletedAt(Some(utc_now()))],
                &[QueryOption::filter(UserFilter::Id(user.id))],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let (live, total) = store.get_all(&mut uow, &[]).await.unwrap();
        assert!(live.is_empty());
        assert_eq!(total, 0);

        let (all, _) = store
            .get_all(&mut uow, &[QueryOption::unscoped()])
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_live());
    }

    #[tokio::test]
    async fn test_get_one_with_selection_writes_only_selected_columns() {
        let store = store();
        let mut uow = store.begin(false).await.unwrap();
        let mut stored = User::new("alice", "p1");
        store.add(&mut uow, &mut stored).await.unwrap();

        let mut out = User::new("renamed", "p2");
        store
            .get_one(
                &mut uow,
                stored.id,
                &mut out,
                &[QueryOption::select([UserColumn::CreatedAt])],
            )
            .await
            .unwrap();

        assert_eq!(out.created_at(), stored.created_at());
        assert_eq!(out.username, "renamed");
        assert_eq!(out.id, 0);
    }

    #[tokio::test]
    async fn test_exists_sees_committed_rows_only() {
        let store = store();
        let mut uow = store.begin(false).await.unwrap();
        let mut user = User::new("alice", "p1");
        store.add(&mut uow, &mut user).await.unwrap();
        assert!(!store.exists(user.id, &[]).await.unwrap());

        uow.commit().await.unwrap();
        assert!(store.exists(user.id, &[]).await.unwrap());
        assert!(!store.exists(user.id + 1, &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_keeps_rows_written_by_concurrent_units() {
        let store = store();
        let mut reader = store.begin(true).await.unwrap();
        let mut writer = store.begin(false).await.unwrap();

        store.add(&mut writer, &mut User::new("alice", "p1")).await.unwrap();
        writer.commit().await.unwrap();
        assert_eq!(store.committed().len(), 1);

        let (seen, _) = store.get_all(&mut reader, &[]).await.unwrap();
        assert!(seen.is_empty());
        reader.commit().await.unwrap();
        assert_eq!(store.committed().len(), 1);
    }

    #[tokio::test]
    async fn test_interleaved_writers_both_persist() {
        let store = store();
        let mut first = store.begin(false).await.unwrap();
        let mut second = store.begin(false).await.unwrap();

        store.add(&mut first, &mut User::new("alice", "p1")).await.unwrap();
        store.add(&mut second, &mut User::new("bob", "p2")).await.unwrap();
        second.commit().await.unwrap();
        first.commit().await.unwrap();

        let names: Vec<String> = store.committed().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }
}
