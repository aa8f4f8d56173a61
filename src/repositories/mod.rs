//! Repository layer for data access operations.
//!
//! The storage ports live in [`ports`]; [`postgres`] and [`memory`] provide
//! the two backends. [`Repositories`] bundles one backend behind the ports.

pub mod memory;
mod ports;
pub mod postgres;

pub use memory::MemoryStore;
pub use ports::*;
pub use postgres::PgStore;

use std::sync::Arc;

use crate::db::{AsyncDbPool, UnitOfWork};
use crate::models::{Director, Headmaster, Owner, Student, Teacher};

/// Aggregates all repositories for convenient access.
///
/// Every field points at the same backend, so calls made with a context
/// carrying a unit of work all land in that unit. Cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub users: Arc<dyn UserRepository>,
    pub user_roles: Arc<dyn UserRoleRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub roster: Arc<dyn RosterRepository>,
    pub directors: Arc<dyn ProfileRepository<Director>>,
    pub headmasters: Arc<dyn ProfileRepository<Headmaster>>,
    pub teachers: Arc<dyn ProfileRepository<Teacher>>,
    pub students: Arc<dyn ProfileRepository<Student>>,
    pub owners: Arc<dyn ProfileRepository<Owner>>,
    pub guardians: Arc<dyn GuardianRepository>,
}

impl Repositories {
    /// Creates repositories backed by PostgreSQL.
    ///
    /// # Arguments
    /// * `pool` - The async database connection pool
    pub fn postgres(pool: AsyncDbPool) -> Self {
        Self::from_backend(Arc::new(PgStore::new(pool)))
    }

    /// Creates repositories backed by the in-memory store.
    pub fn in_memory(store: MemoryStore) -> Self {
        Self::from_backend(Arc::new(store))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UnitOfWork
            + UserRepository
            + UserRoleRepository
            + CatalogRepository
            + RosterRepository
            + ProfileRepository<Director>
            + ProfileRepository<Headmaster>
            + ProfileRepository<Teacher>
            + ProfileRepository<Student>
            + ProfileRepository<Owner>
            + GuardianRepository
            + 'static,
    {
        Self {
            unit_of_work: backend.clone(),
            users: backend.clone(),
            user_roles: backend.clone(),
            catalog: backend.clone(),
            roster: backend.clone(),
            directors: backend.clone(),
            headmasters: backend.clone(),
            teachers: backend.clone(),
            students: backend.clone(),
            owners: backend.clone(),
            guardians: backend,
        }
    }
}
