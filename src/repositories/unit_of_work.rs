//! Transaction boundary shared by every repository call of one request.
//!
//! A unit of work is opened by [`UnitOfWorkFactory::begin`], threaded through
//! repository calls by `&mut`, and finished by exactly one `commit` or
//! `rollback`. Dropping a pending unit of work rolls it back, so early returns
//! through `?` never leave a transaction open.

use async_trait::async_trait;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, TransactionManager};
use tracing::{debug, warn};

use crate::db::{AsyncDbPool, OwnedDbConnection};
use crate::error::{AppError, AppResult};

/// Lifecycle state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UowStatus {
    Pending,
    Committed,
    RolledBack,
}

impl UowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UowStatus::Pending => "pending",
            UowStatus::Committed => "committed",
            UowStatus::RolledBack => "rolled back",
        }
    }
}

/// One open transaction.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read-only intent declared at `begin`. Advisory: recorded, not enforced.
    fn is_read_only(&self) -> bool;

    fn status(&self) -> UowStatus;

    /// Makes every operation performed in this unit durable.
    ///
    /// Fails with [`AppError::Transaction`] once the unit has terminated.
    async fn commit(&mut self) -> AppResult<()>;

    /// Discards every operation performed in this unit. No-op once the unit
    /// has terminated.
    async fn rollback(&mut self) -> AppResult<()>;
}

/// Opens units of work.
#[async_trait]
pub trait UnitOfWorkFactory: Clone + Send + Sync + 'static {
    type Uow: UnitOfWork;

    async fn begin(&self, read_only: bool) -> AppResult<Self::Uow>;
}

pub(crate) fn terminated(status: UowStatus) -> AppError {
    AppError::Transaction {
        message: format!("unit of work already {}", status.as_str()),
    }
}

/// PostgreSQL unit of work: a pooled connection with an open transaction.
pub struct PgUnitOfWork {
    conn: Option<OwnedDbConnection>,
    read_only: bool,
    status: UowStatus,
}

impl PgUnitOfWork {
    /// Checks out a connection and opens a transaction on it.
    pub async fn begin(pool: &AsyncDbPool, read_only: bool) -> AppResult<Self> {
        let mut conn = pool.get_owned().await?;

        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::begin_transaction(
            &mut *conn,
        )
        .await
        .map_err(|e| AppError::Database {
            operation: "begin transaction".to_string(),
            source: e.into(),
        })?;

        debug!(read_only, "Unit of work started");
        Ok(Self {
            conn: Some(conn),
            read_only,
            status: UowStatus::Pending,
        })
    }

    /// The transaction's connection, available while the unit is pending.
    pub fn connection(&mut self) -> AppResult<&mut AsyncPgConnection> {
        if self.status != UowStatus::Pending {
            return Err(terminated(self.status));
        }
        self.conn
            .as_deref_mut()
            .ok_or_else(|| terminated(self.status))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn status(&self) -> UowStatus {
        self.status
    }

    async fn commit(&mut self) -> AppResult<()> {
        let conn = self.connection()?;
        let result =
            <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::commit_transaction(
                conn,
            )
            .await;

        match result {
            Ok(()) => {
                self.status = UowStatus::Committed;
                debug!(read_only = self.read_only, "Unit of work committed");
                Ok(())
            }
            Err(e) => {
                // A failed COMMIT leaves nothing to keep; make sure the
                // connection goes back to the pool without an open transaction.
                let _ = self.rollback().await;
                Err(AppError::Database {
                    operation: "commit transaction".to_string(),
                    source: e.into(),
                })
            }
        }
    }

    async fn rollback(&mut self) -> AppResult<()> {
        if self.status != UowStatus::Pending {
            return Ok(());
        }
        self.status = UowStatus::RolledBack;

        let Some(conn) = self.conn.as_deref_mut() else {
            return Ok(());
        };
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::rollback_transaction(
            conn,
        )
        .await
        .map_err(|e| AppError::Database {
            operation: "rollback transaction".to_string(),
            source: e.into(),
        })?;

        debug!(read_only = self.read_only, "Unit of work rolled back");
        Ok(())
    }
}

impl Drop for PgUnitOfWork {
    fn drop(&mut self) {
        if self.status != UowStatus::Pending {
            return;
        }
        self.status = UowStatus::RolledBack;

        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let result = <AnsiTransactionManager as TransactionManager<
                        AsyncPgConnection,
                    >>::rollback_transaction(&mut *conn)
                    .await;
                    if let Err(e) = result {
                        warn!(error = %e, "Rollback of abandoned unit of work failed");
                    }
                });
            }
            // The pool discards connections returned mid-transaction.
            Err(_) => warn!("Unit of work dropped outside a runtime; discarding connection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_error_names_state() {
        let error = terminated(UowStatus::Committed);
        assert_eq!(
            error.to_string(),
            "Transaction error: unit of work already committed"
        );
    }
}
