//! In-memory storage backend for development and testing.
//!
//! All tables live behind one async mutex. A unit of work holds that mutex
//! from `begin` until it is closed, so units of work are serializable and
//! plain calls wait for them. The table state captured at `begin` is restored
//! on rollback or when the unit is dropped without being closed.

mod catalog;
mod guardians;
mod profiles;
mod users;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::db::{Ctx, TxHandle, UnitOfWork};
use crate::error::{AppError, AppResult};
use crate::models::{
    Director, EduOrganization, Grade, Group, Headmaster, Owner, School, Student,
    StudentGuardian, Teacher, User, UserRole,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    users: HashMap<Uuid, User>,
    user_roles: HashMap<Uuid, UserRole>,
    organizations: HashMap<Uuid, EduOrganization>,
    schools: HashMap<Uuid, School>,
    grades: HashMap<Uuid, Grade>,
    groups: HashMap<Uuid, Group>,
    directors: HashMap<Uuid, Director>,
    headmasters: HashMap<Uuid, Headmaster>,
    teachers: HashMap<Uuid, Teacher>,
    students: HashMap<Uuid, Student>,
    owners: HashMap<Uuid, Owner>,
    guardians: HashMap<Uuid, StudentGuardian>,
}

/// Exclusive access to the tables for the lifetime of a unit of work.
struct ActiveTx {
    guard: OwnedMutexGuard<Tables>,
    snapshot: Option<Tables>,
}

impl ActiveTx {
    fn commit(mut self) {
        self.snapshot = None;
    }
}

impl Drop for ActiveTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

struct MemoryTransaction {
    active: Mutex<Option<ActiveTx>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the tables visible to `ctx` under its deadline.
    async fn with_tables<T, F>(&self, ctx: &Ctx, operation: &str, f: F) -> AppResult<T>
    where
        T: Send,
        F: FnOnce(&mut Tables) -> AppResult<T> + Send,
    {
        ctx.run(operation, async move {
            match ctx.transaction() {
                Some(tx) => {
                    let state = tx.state::<MemoryTransaction>()?;
                    let mut slot = state.active.lock().await;
                    let active = (*slot)
                        .as_mut()
                        .ok_or(AppError::TransactionClosed { id: tx.id() })?;
                    f(&mut *active.guard)
                }
                None => {
                    let mut tables = self.tables.lock().await;
                    f(&mut *tables)
                }
            }
        })
        .await
    }

    async fn close(&self, tx: &TxHandle) -> AppResult<ActiveTx> {
        let state = tx.state::<MemoryTransaction>()?;
        state
            .active
            .lock()
            .await
            .take()
            .ok_or(AppError::TransactionClosed { id: tx.id() })
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self, ctx: &Ctx) -> AppResult<TxHandle> {
        let guard = ctx
            .run("begin unit of work", async {
                Ok(self.tables.clone().lock_owned().await)
            })
            .await?;
        let snapshot = Tables::clone(&guard);
        Ok(TxHandle::new(MemoryTransaction {
            active: Mutex::new(Some(ActiveTx {
                guard,
                snapshot: Some(snapshot),
            })),
        }))
    }

    async fn commit(&self, tx: &TxHandle) -> AppResult<()> {
        self.close(tx).await?.commit();
        Ok(())
    }

    async fn rollback(&self, tx: &TxHandle) -> AppResult<()> {
        drop(self.close(tx).await?);
        Ok(())
    }
}

fn invalid_reference(entity: &str, field: &str, value: Uuid) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        reason: format!("Invalid reference from {} with value '{}'", entity, value),
    }
}

fn duplicate(entity: &str, field: &str, value: impl ToString) -> AppError {
    AppError::Duplicate {
        entity: entity.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn pick<T: Clone>(table: &HashMap<Uuid, T>, ids: &[Uuid]) -> Vec<T> {
    ids.iter().filter_map(|id| table.get(id)).cloned().collect()
}
