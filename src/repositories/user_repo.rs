//! PostgreSQL repository for the `users` table.
//!
//! Queries are assembled from boxed predicates so that any combination of
//! [`UserFilter`]s and the live-record scope can be applied at runtime.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::BoxedUpdateStatement;
use diesel::sql_types::Bool;
use diesel_async::RunQueryDsl;
use jiff_diesel::ToDiesel;

use super::query::{QueryOption, QueryPlan};
use super::repository::Repository;
use super::unit_of_work::{PgUnitOfWork, UnitOfWorkFactory};
use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult, DatabaseErrorConverter};
use crate::models::{
    utc_now, Audited, Entity, NewUserRecord, User, UserField, UserFieldChanges, UserFilter,
    UserRecordChanges,
};
use crate::schema::users;

type UserPredicate = Box<dyn BoxableExpression<users::table, Pg, SqlType = Bool>>;

fn filter_predicate(filter: &UserFilter) -> UserPredicate {
    match filter {
        UserFilter::Id(id) => Box::new(users::id.eq(*id)),
        UserFilter::Username(name) => Box::new(users::username.eq(name.clone())),
    }
}

/// The live-record scope (unless lifted) followed by every filter.
fn scope_predicates(plan: &QueryPlan<'_, User>) -> Vec<UserPredicate> {
    let mut predicates: Vec<UserPredicate> = Vec::with_capacity(plan.filters.len() + 1);
    if !plan.unscoped {
        predicates.push(Box::new(users::deleted_at.is_null()));
    }
    predicates.extend(plan.filters.iter().map(|filter| filter_predicate(filter)));
    predicates
}

/// A single predicate addressing `key` within the plan's scope.
fn keyed_predicate(key: i32, plan: &QueryPlan<'_, User>) -> UserPredicate {
    let by_key: UserPredicate = Box::new(users::id.eq(key));
    scope_predicates(plan)
        .into_iter()
        .fold(by_key, |acc, predicate| -> UserPredicate {
            Box::new(acc.and(predicate))
        })
}

/// Scoped, filtered `SELECT` over `users`, ordered by ascending id.
fn scoped_query(plan: &QueryPlan<'_, User>) -> users::BoxedQuery<'static, Pg> {
    let mut query = users::table.order(users::id.asc()).into_boxed();
    for predicate in scope_predicates(plan) {
        query = query.filter(predicate);
    }
    query
}

fn keyed_query(key: i32, plan: &QueryPlan<'_, User>) -> users::BoxedQuery<'static, Pg> {
    users::table.filter(keyed_predicate(key, plan)).into_boxed()
}

/// `UPDATE users` restricted to `key` within the plan's scope; `SET` pending.
fn keyed_update(
    key: i32,
    plan: &QueryPlan<'_, User>,
) -> BoxedUpdateStatement<'static, Pg, users::table> {
    diesel::update(users::table)
        .filter(keyed_predicate(key, plan))
        .into_boxed()
}

fn db_error(operation: &'static str) -> impl FnOnce(diesel::result::Error) -> AppError {
    move |error| DatabaseErrorConverter::convert_diesel_error(error, operation)
}

/// User repository holding an async connection pool.
///
/// Since `AsyncDbPool` (bb8::Pool) internally uses `Arc`, cloning is cheap
/// (just reference count increment). No need for `Arc<UserRepository>`.
#[derive(Clone)]
pub struct UserRepository {
    pool: AsyncDbPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for UserRepository {
    type Uow = PgUnitOfWork;

    async fn begin(&self, read_only: bool) -> AppResult<PgUnitOfWork> {
        PgUnitOfWork::begin(&self.pool, read_only).await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn add(&self, uow: &mut PgUnitOfWork, entity: &mut User) -> AppResult<()> {
        let now = utc_now();
        entity.set_created_at(now);
        entity.set_updated_at(now);

        let conn = uow.connection()?;
        let id: i32 = diesel::insert_into(users::table)
            .values(NewUserRecord::from(&*entity))
            .returning(users::id)
            .get_result(conn)
            .await
            .map_err(db_error("insert user"))?;

        entity.set_key(id);
        Ok(())
    }

    async fn get_all(
        &self,
        uow: &mut PgUnitOfWork,
        options: &[QueryOption<User>],
    ) -> AppResult<(Vec<User>, i64)> {
        let plan = QueryPlan::new(options);
        let query = scoped_query(&plan).select(User::as_select());

        let conn = uow.connection()?;
        let rows: Vec<User> = query.load(conn).await.map_err(db_error("list users"))?;
        let total = rows.len() as i64;
        Ok((rows, total))
    }

    async fn get_one(
        &self,
        uow: &mut PgUnitOfWork,
        key: i32,
        out: &mut User,
        options: &[QueryOption<User>],
    ) -> AppResult<()> {
        let plan = QueryPlan::new(options);
        let conn = uow.connection()?;
        let row: Option<User> = keyed_query(key, &plan)
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
            .map_err(db_error("find user"))?;

        let row = row.ok_or_else(|| AppError::not_found(User::NAME, "id", key))?;
        plan.project(&row, out);
        Ok(())
    }

    async fn first(
        &self,
        uow: &mut PgUnitOfWork,
        options: &[QueryOption<User>],
    ) -> AppResult<User> {
        let plan = QueryPlan::new(options);
        let query = scoped_query(&plan).select(User::as_select());

        let conn = uow.connection()?;
        let row: Option<User> = query
            .first(conn)
            .await
            .optional()
            .map_err(db_error("find user"))?;

        row.ok_or_else(|| AppError::not_found(User::NAME, "query", format!("{:?}", plan.filters)))
    }

    async fn save(&self, uow: &mut PgUnitOfWork, entity: &mut User) -> AppResult<()> {
        entity.set_updated_at(utc_now());

        let plan = QueryPlan::<User>::new(&[]);
        let changes = UserRecordChanges::from(&*entity);
        let conn = uow.connection()?;
        let affected = keyed_update(entity.id, &plan)
            .set(&changes)
            .execute(conn)
            .await
            .map_err(db_error("update user"))?;

        if affected == 0 {
            return Err(AppError::not_found(User::NAME, "id", entity.id));
        }
        Ok(())
    }

    async fn update_with_map(
        &self,
        uow: &mut PgUnitOfWork,
        entity: &User,
        fields: &[UserField],
        options: &[QueryOption<User>],
    ) -> AppResult<usize> {
        let mut changes = UserFieldChanges::from_fields(fields);
        if changes.updated_at.is_none() {
            changes.updated_at = Some(utc_now().to_diesel());
        }

        let plan = QueryPlan::new(options);
        let conn = uow.connection()?;
        keyed_update(entity.id, &plan)
            .set(&changes)
            .execute(conn)
            .await
            .map_err(db_error("update user fields"))
    }

    async fn exists(&self, key: i32, options: &[QueryOption<User>]) -> AppResult<bool> {
        let plan = QueryPlan::new(options);
        let mut conn = self.pool.get().await?;
        let found: Option<i32> = keyed_query(key, &plan)
            .select(users::id)
            .first(&mut *conn)
            .await
            .optional()
            .map_err(db_error("check user existence"))?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;

    const LIVE_SCOPE: &str = r#""users"."deleted_at" IS NULL"#;
    const BY_ID: &str = r#""users"."id" = $1"#;
    const ORDER_BY_ID: &str = r#"ORDER BY "users"."id" ASC"#;

    fn sql<T: diesel::query_builder::QueryFragment<Pg>>(query: &T) -> String {
        debug_query::<Pg, _>(query).to_string()
    }

    #[test]
    fn test_default_scope_excludes_soft_deleted() {
        let plan = QueryPlan::<User>::new(&[]);
        let listed = sql(&scoped_query(&plan).select(User::as_select()));
        assert!(listed.contains(LIVE_SCOPE), "{listed}");
        assert!(listed.contains(ORDER_BY_ID), "{listed}");

        let keyed = sql(&keyed_query(7, &plan).select(users::id));
        assert!(keyed.contains(LIVE_SCOPE), "{keyed}");
        assert!(keyed.contains(BY_ID), "{keyed}");
    }

    #[test]
    fn test_unscoped_lifts_live_restriction() {
        let options = [QueryOption::unscoped()];
        let plan = QueryPlan::<User>::new(&options);

        let listed = sql(&scoped_query(&plan));
        assert!(!listed.contains(LIVE_SCOPE), "{listed}");
        assert!(listed.contains(ORDER_BY_ID), "{listed}");

        let keyed = sql(&keyed_query(7, &plan));
        assert!(!keyed.contains(LIVE_SCOPE), "{keyed}");
        assert!(keyed.contains(BY_ID), "{keyed}");
    }

    #[test]
    fn test_filters_are_combined_with_scope() {
        let options = [QueryOption::filter(UserFilter::Username("alice".to_string()))];
        let plan = QueryPlan::<User>::new(&options);

        let query = sql(&scoped_query(&plan));
        assert!(query.contains(LIVE_SCOPE), "{query}");
        assert!(query.contains(r#""users"."username" = $1"#), "{query}");
        assert!(query.contains("\"alice\""), "{query}");
    }

    #[test]
    fn test_save_updates_live_row_by_id() {
        let plan = QueryPlan::<User>::new(&[]);
        let mut user = User::new("alice", "p1");
        user.set_key(3);
        let changes = UserRecordChanges::from(&user);

        let statement = sql(&keyed_update(user.id, &plan).set(&changes));
        assert!(statement.starts_with(r#"UPDATE "users" SET"#), "{statement}");
        assert!(statement.contains(r#""users"."id" = $"#), "{statement}");
        assert!(statement.contains(LIVE_SCOPE), "{statement}");
    }

    #[test]
    fn test_field_update_targets_id_and_extra_filters() {
        let options = [QueryOption::filter(UserFilter::Id(3))];
        let plan = QueryPlan::<User>::new(&options);
        let changes = UserFieldChanges::from_fields(&[UserField::DeletedAt(Some(utc_now()))]);

        let statement = sql(&keyed_update(3, &plan).set(&changes));
        assert!(statement.contains(r#""deleted_at" = $"#), "{statement}");
        assert!(statement.contains(r#""users"."id" = $"#), "{statement}");
        assert!(statement.contains(LIVE_SCOPE), "{statement}");
    }
}
