//! Creation of a role profile together with the role row it depends on.

use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::db::{Ctx, UnitOfWorkCoordinator};
use crate::error::{AppResult, ResultExt};
use crate::models::{NewProfile, Profile};
use crate::repositories::ProfileRepository;
use crate::services::IdentityService;

/// Assigns `P::ROLE` to a user and stores the profile referencing that role,
/// both or neither.
#[derive(Clone)]
pub struct ProvisioningWorkflow<P: Profile> {
    coordinator: UnitOfWorkCoordinator,
    identity: IdentityService,
    profiles: Arc<dyn ProfileRepository<P>>,
}

impl<P: Profile> ProvisioningWorkflow<P> {
    pub fn new(
        coordinator: UnitOfWorkCoordinator,
        identity: IdentityService,
        profiles: Arc<dyn ProfileRepository<P>>,
    ) -> Self {
        Self {
            coordinator,
            identity,
            profiles,
        }
    }

    /// Validates `new` and provisions it in a unit of work of its own.
    ///
    /// # Errors
    /// `Validation` for malformed input, `RoleAlreadyAssigned` or `Duplicate`
    /// on conflicts. Nothing is persisted when an error is returned.
    pub async fn provision(&self, ctx: &Ctx, new: P::New) -> AppResult<P> {
        new.validate()?;

        let (tx_ctx, tx) = self.coordinator.begin(ctx).await?;
        let result = self.provision_in(&tx_ctx, new).await;
        let profile = self.coordinator.end(tx, result).await?;

        info!(
            entity = P::ENTITY,
            id = %profile.id(),
            user_id = %profile.user_id(),
            role_id = %profile.role_id(),
            "Profile provisioned"
        );
        Ok(profile)
    }

    /// Runs the provisioning steps inside the unit of work carried by
    /// `tx_ctx`, leaving commit and rollback to its owner.
    pub async fn provision_in(&self, tx_ctx: &Ctx, new: P::New) -> AppResult<P> {
        let role = self
            .identity
            .add_role_to_user(tx_ctx, P::new_user_id(&new), P::ROLE, P::new_scope(&new))
            .await
            .context(format!("assign {} role", P::ROLE))?;

        self.profiles
            .create(
                tx_ctx,
                NewProfile {
                    role_id: role.id,
                    fields: new,
                },
            )
            .await
            .context(format!("create {}", P::ENTITY))
    }
}
