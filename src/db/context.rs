//! Per-call context threaded through every repository operation.
//!
//! A [`Ctx`] optionally carries the handle of an open unit of work and a
//! deadline. Repositories route their queries through the transaction when a
//! handle is present; otherwise they use a fresh pooled connection.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Type-erased handle to a backend transaction.
///
/// Cloning is cheap; all clones refer to the same transaction.
#[derive(Clone)]
pub struct TxHandle {
    id: Uuid,
    state: Arc<dyn Any + Send + Sync>,
}

impl TxHandle {
    pub fn new<S: Any + Send + Sync>(state: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(state),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Backend-specific state behind the handle.
    ///
    /// Fails when the handle was opened by a different backend.
    pub fn state<S: Any + Send + Sync>(&self) -> AppResult<&S> {
        self.state.downcast_ref::<S>().ok_or_else(|| {
            AppError::internal(format!(
                "unit of work {} was opened by a different storage backend",
                self.id
            ))
        })
    }
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxHandle").field("id", &self.id).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ctx {
    tx: Option<TxHandle>,
    deadline: Option<Instant>,
}

impl Ctx {
    /// Context without a deadline or transaction.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the existing and the given deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            tx: self.tx.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn with_transaction(&self, tx: TxHandle) -> Self {
        Self {
            tx: Some(tx),
            deadline: self.deadline,
        }
    }

    pub fn transaction(&self) -> Option<&TxHandle> {
        self.tx.as_ref()
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `operation` under the context deadline.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let Some(deadline) = self.deadline else {
            return fut.await;
        };
        let exceeded = || AppError::DeadlineExceeded {
            operation: operation.to_string(),
        };
        if Instant::now() >= deadline {
            return Err(exceeded());
        }
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(exceeded()),
        }
    }
}
