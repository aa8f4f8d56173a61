//! Atomic units of work spanning several repository calls.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::{Ctx, TxHandle};
use crate::error::{AppError, AppResult, TxStage};

/// Storage backend able to open and close transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Opens a transaction, honouring the context deadline.
    async fn begin(&self, ctx: &Ctx) -> AppResult<TxHandle>;

    async fn commit(&self, tx: &TxHandle) -> AppResult<()>;

    async fn rollback(&self, tx: &TxHandle) -> AppResult<()>;
}

/// Opens units of work and closes them according to the outcome of the
/// work performed inside.
///
/// ```ignore
/// let (tx_ctx, tx) = coordinator.begin(&ctx).await?;
/// let result = do_work(&tx_ctx).await;
/// let value = coordinator.end(tx, result).await?;
/// ```
#[derive(Clone)]
pub struct UnitOfWorkCoordinator {
    backend: Arc<dyn UnitOfWork>,
}

impl UnitOfWorkCoordinator {
    pub fn new(backend: Arc<dyn UnitOfWork>) -> Self {
        Self { backend }
    }

    /// Opens a unit of work and derives the context that participates in it.
    ///
    /// # Errors
    /// `NestedUnitOfWork` when `ctx` already carries a transaction; compose
    /// by passing the existing transactional context instead.
    pub async fn begin(&self, ctx: &Ctx) -> AppResult<(Ctx, TxHandle)> {
        if let Some(open) = ctx.transaction() {
            return Err(AppError::NestedUnitOfWork { open: open.id() });
        }
        let tx = self.backend.begin(ctx).await?;
        tracing::debug!(tx_id = %tx.id(), "Unit of work opened");
        Ok((ctx.with_transaction(tx.clone()), tx))
    }

    /// Commits on `Ok`, rolls back on `Err` and returns the outcome.
    ///
    /// A failure while closing never hides the original error: a failed
    /// rollback reports both the rollback failure and the error that caused it.
    pub async fn end<T>(&self, tx: TxHandle, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => match self.backend.commit(&tx).await {
                Ok(()) => {
                    tracing::debug!(tx_id = %tx.id(), "Unit of work committed");
                    Ok(value)
                }
                Err(failure) => {
                    tracing::error!(tx_id = %tx.id(), error = %failure, "Commit failed");
                    Err(AppError::UnitOfWork {
                        stage: TxStage::Commit,
                        source: Box::new(failure),
                        cause: None,
                    })
                }
            },
            Err(cause) => match self.backend.rollback(&tx).await {
                Ok(()) => {
                    tracing::warn!(tx_id = %tx.id(), error = %cause, "Unit of work rolled back");
                    Err(cause)
                }
                Err(failure) => {
                    tracing::error!(
                        tx_id = %tx.id(),
                        error = %failure,
                        cause = %cause,
                        "Rollback failed"
                    );
                    Err(AppError::UnitOfWork {
                        stage: TxStage::Rollback,
                        source: Box::new(failure),
                        cause: Some(Box::new(cause)),
                    })
                }
            },
        }
    }
}
