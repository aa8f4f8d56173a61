//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories, units of work and the hydrator.

mod catalog_service;
mod guardian_service;
mod hydrator;
mod identity;
mod profile_service;
mod provisioning;

#[cfg(test)]
mod tests;

pub use catalog_service::CatalogService;
pub use guardian_service::GuardianService;
pub use hydrator::Hydrator;
pub use identity::IdentityService;
pub use profile_service::{
    DirectorService, HeadmasterService, OwnerService, ProfileService, StudentService,
    TeacherService,
};
pub use provisioning::ProvisioningWorkflow;

use std::sync::Arc;

use crate::db::UnitOfWorkCoordinator;
use crate::models::Profile;
use crate::repositories::{ProfileRepository, Repositories};

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since every service shares its repositories behind `Arc`.
#[derive(Clone)]
pub struct Services {
    pub identity: IdentityService,
    pub catalog: CatalogService,
    pub directors: DirectorService,
    pub headmasters: HeadmasterService,
    pub teachers: TeacherService,
    pub students: StudentService,
    pub owners: OwnerService,
    pub guardians: GuardianService,
}

impl Services {
    /// Creates a new Services instance from Repositories.
    pub fn new(repos: Repositories) -> Self {
        let coordinator = UnitOfWorkCoordinator::new(repos.unit_of_work.clone());
        let hydrator = Hydrator::new(
            repos.users.clone(),
            repos.catalog.clone(),
            repos.roster.clone(),
        );
        let identity = IdentityService::new(
            repos.users.clone(),
            repos.user_roles.clone(),
            hydrator.clone(),
        );
        let profiles = ProfileServices {
            coordinator: &coordinator,
            identity: &identity,
            hydrator: &hydrator,
        };

        Self {
            catalog: CatalogService::new(repos.catalog.clone(), hydrator.clone()),
            directors: profiles.service(repos.directors),
            headmasters: profiles.service(repos.headmasters),
            teachers: profiles.service(repos.teachers),
            students: profiles.service(repos.students.clone()),
            owners: profiles.service(repos.owners),
            guardians: GuardianService::new(
                coordinator.clone(),
                identity.clone(),
                repos.students,
                repos.guardians,
                hydrator,
            ),
            identity,
        }
    }
}

/// Shared dependencies of the profile services.
struct ProfileServices<'a> {
    coordinator: &'a UnitOfWorkCoordinator,
    identity: &'a IdentityService,
    hydrator: &'a Hydrator,
}

impl ProfileServices<'_> {
    fn service<P: Profile>(&self, profiles: Arc<dyn ProfileRepository<P>>) -> ProfileService<P> {
        let workflow = ProvisioningWorkflow::new(
            self.coordinator.clone(),
            self.identity.clone(),
            profiles.clone(),
        );
        ProfileService::new(workflow, profiles, self.hydrator.clone())
    }
}
