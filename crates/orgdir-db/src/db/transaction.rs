//! Database transaction utilities
//!
//! Multi-statement mutations run inside a [`TransactionGuard`]. The work is
//! written as a function over `&mut PgConnection` that returns a `Result`;
//! [`TransactionGuard::finish`] then commits on `Ok` and rolls back on any
//! `Err`, domain errors included, handing the original error back.
//!
//! ```ignore
//! let mut tx = TransactionGuard::begin(&pool).await?;
//! let outcome = repo.create(&mut tx, input).await;
//! tx.finish(outcome).await
//! ```

use orgdir_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};

pub struct TransactionGuard {
    transaction: Transaction<'static, Postgres>,
}

impl TransactionGuard {
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin database transaction");
            AppError::StoreFailure(e)
        })?;
        Ok(Self { transaction })
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.transaction.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit database transaction");
            AppError::StoreFailure(e)
        })
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        self.transaction.rollback().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to rollback database transaction");
            AppError::StoreFailure(e)
        })
    }

    /// Commit if `outcome` is `Ok`, otherwise roll back and return the
    /// original error. A failed rollback is logged, never substituted for it.
    pub async fn finish<R>(self, outcome: Result<R, AppError>) -> Result<R, AppError> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Rolling back transaction");
                let _ = self.rollback().await;
                Err(err)
            }
        }
    }
}

impl Deref for TransactionGuard {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl DerefMut for TransactionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.transaction
    }
}
