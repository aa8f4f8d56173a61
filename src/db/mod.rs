//! Database access primitives: the connection pool, the per-call context and
//! units of work.

mod context;
mod pool;
mod unit_of_work;

pub use context::{Ctx, TxHandle};
pub use pool::{
    AsyncDbPool, MIGRATIONS, OwnedConnection, establish_async_connection_pool,
    run_pending_migrations,
};
pub use unit_of_work::{UnitOfWork, UnitOfWorkCoordinator};
