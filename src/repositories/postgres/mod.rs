//! PostgreSQL storage backend built on diesel_async.
//!
//! A unit of work checks one connection out of the pool and keeps it inside a
//! database transaction until it is committed or rolled back. Repository calls
//! made with a context carrying that unit reuse its connection; other calls
//! take their own pooled connection.

mod catalog;
mod guardians;
mod profiles;
mod rows;
mod users;

use async_trait::async_trait;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, TransactionManager};
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;
use uuid::Uuid;

use crate::db::{AsyncDbPool, Ctx, OwnedConnection, TxHandle, UnitOfWork};
use crate::error::{AppError, AppResult, DatabaseErrorConverter};

/// Repository implementations over an async connection pool.
///
/// Since `AsyncDbPool` (bb8::Pool) internally uses `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct PgStore {
    pool: AsyncDbPool,
}

/// Connection owned by an open unit of work.
///
/// A connection dropped while still inside its transaction is reported as
/// broken to the pool and discarded, which ends the transaction server side.
struct PgTransaction {
    conn: Mutex<Option<OwnedConnection>>,
}

/// Connection used by a single repository call.
enum PgConn<'a> {
    Pooled(OwnedConnection),
    Tx {
        id: Uuid,
        slot: MutexGuard<'a, Option<OwnedConnection>>,
    },
}

impl PgConn<'_> {
    fn get(&mut self) -> AppResult<&mut AsyncPgConnection> {
        match self {
            PgConn::Pooled(conn) => Ok(&mut **conn),
            PgConn::Tx { id, slot } => match &mut **slot {
                Some(conn) => Ok(&mut **conn),
                None => Err(AppError::TransactionClosed { id: *id }),
            },
        }
    }
}

impl PgStore {
    /// Creates a new PgStore with the given connection pool.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Connection for a call made with `ctx`.
    async fn conn<'c>(&self, ctx: &'c Ctx) -> AppResult<PgConn<'c>> {
        match ctx.transaction() {
            Some(tx) => {
                let state = tx.state::<PgTransaction>()?;
                Ok(PgConn::Tx {
                    id: tx.id(),
                    slot: state.conn.lock().await,
                })
            }
            None => self.checkout().await.map(PgConn::Pooled),
        }
    }

    async fn checkout(&self) -> AppResult<OwnedConnection> {
        self.pool
            .get_owned()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })
    }

    async fn close(&self, tx: &TxHandle) -> AppResult<OwnedConnection> {
        let state = tx.state::<PgTransaction>()?;
        state
            .conn
            .lock()
            .await
            .take()
            .ok_or(AppError::TransactionClosed { id: tx.id() })
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self, ctx: &Ctx) -> AppResult<TxHandle> {
        ctx.run("begin transaction", async {
            let mut conn = self.checkout().await?;
            <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::begin_transaction(
                &mut *conn,
            )
            .await
            .map_err(|e| db_error(e, "begin transaction"))?;
            Ok(TxHandle::new(PgTransaction {
                conn: Mutex::new(Some(conn)),
            }))
        })
        .await
    }

    async fn commit(&self, tx: &TxHandle) -> AppResult<()> {
        let mut conn = self.close(tx).await?;
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::commit_transaction(
            &mut *conn,
        )
        .await
        .map_err(|e| db_error(e, "commit transaction"))
    }

    async fn rollback(&self, tx: &TxHandle) -> AppResult<()> {
        let mut conn = self.close(tx).await?;
        let result =
            <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::rollback_transaction(
                &mut *conn,
            )
            .await;
        if result.is_err() {
            warn!(tx_id = %tx.id(), "Rollback failed, connection will be discarded");
        }
        result.map_err(|e| db_error(e, "rollback transaction"))
    }
}

fn db_error(error: diesel::result::Error, operation: &str) -> AppError {
    DatabaseErrorConverter::convert_diesel_error(error, operation)
}
