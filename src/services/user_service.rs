//! User service for business logic operations.
//!
//! Every operation opens one unit of work, performs its repository calls
//! inside it, and commits. Any early return drops the unit of work, which
//! rolls it back.

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{utc_now, Entity, User, UserColumn, UserField, UserFilter};
use crate::repositories::{QueryOption, Repository, UnitOfWork};

/// Message shared by every failed login so callers cannot tell which part of
/// the credentials was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn invalid_user_id() -> AppError {
    AppError::validation("id", "User ID is invalid")
}

/// A user deleted after the existence check reads as an invalid id.
fn gone_as_invalid_id(err: AppError) -> AppError {
    if err.is_not_found() {
        invalid_user_id()
    } else {
        err
    }
}

fn invalid_credentials() -> AppError {
    AppError::bad_request(INVALID_CREDENTIALS)
}

/// User service for handling user-related business logic.
///
/// Generic over the repository so the same rules run against PostgreSQL and
/// against the in-memory store used in tests. Cloning is cheap whenever the
/// repository is.
#[derive(Clone)]
pub struct UserService<R> {
    repo: R,
}

impl<R: Repository<User>> UserService<R> {
    /// Creates a new UserService with the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new user.
    ///
    /// # Returns
    /// The stored user with its assigned id and timestamps.
    pub async fn create_user(&self, mut user: User) -> AppResult<User> {
        let mut uow = self.repo.begin(false).await?;
        self.repo.add(&mut uow, &mut user).await?;
        uow.commit().await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Lists every live user.
    ///
    /// # Returns
    /// A tuple of (users, total_count)
    pub async fn list_users(&self) -> AppResult<(Vec<User>, i64)> {
        let mut uow = self.repo.begin(true).await?;
        let listed = self.repo.get_all(&mut uow, &[]).await?;
        uow.commit().await?;
        Ok(listed)
    }

    /// Replaces the stored user `id` with `user`.
    ///
    /// The client never controls `created_at`: the stored value is read back
    /// into `user` before the full-record save.
    ///
    /// # Errors
    /// `Validation` when no live user has `id`.
    pub async fn update_user(&self, id: i32, mut user: User) -> AppResult<User> {
        self.ensure_exists(id).await?;
        user.set_key(id);

        let mut uow = self.repo.begin(false).await?;
        self.repo
            .get_one(
                &mut uow,
                id,
                &mut user,
                &[QueryOption::select([UserColumn::CreatedAt])],
            )
            .await
            .map_err(gone_as_invalid_id)?;
        self.repo
            .save(&mut uow, &mut user)
            .await
            .map_err(gone_as_invalid_id)?;
        uow.commit().await?;

        info!(user_id = id, "User updated");
        Ok(user)
    }

    /// Soft-deletes user `id` by stamping `deleted_at`.
    ///
    /// # Errors
    /// `Validation` when no live user has `id`.
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.ensure_exists(id).await?;

        let mut uow = self.repo.begin(false).await?;
        let affected = self
            .repo
            .update_with_map(
                &mut uow,
                &User::with_id(id),
                &[UserField::DeletedAt(Some(utc_now()))],
                &[QueryOption::filter(UserFilter::Id(id))],
            )
            .await?;
        if affected == 0 {
            // Deleted concurrently between the existence check and the update.
            return Err(invalid_user_id());
        }
        uow.commit().await?;

        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Checks `username` / `password` against the stored plaintext password.
    ///
    /// # Returns
    /// The user's id on a match.
    ///
    /// # Errors
    /// The same `BadRequest` for an unknown username and for a wrong
    /// password. Infrastructure errors pass through unchanged.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<i32> {
        let mut uow = self.repo.begin(true).await?;
        let found = self
            .repo
            .first(
                &mut uow,
                &[QueryOption::filter(UserFilter::Username(username.to_string()))],
            )
            .await;
        let user = match found {
            Ok(user) => user,
            Err(err) if err.is_not_found() => {
                debug!(username, "Login for unknown username");
                return Err(invalid_credentials());
            }
            Err(err) => return Err(err),
        };
        uow.commit().await?;

        if user.password.as_bytes() != password.as_bytes() {
            debug!(user_id = user.id, "Login with wrong password");
            return Err(invalid_credentials());
        }
        Ok(user.id)
    }

    async fn ensure_exists(&self, id: i32) -> AppResult<()> {
        if self.repo.exists(id, &[]).await? {
            Ok(())
        } else {
            Err(invalid_user_id())
        }
    }
}
