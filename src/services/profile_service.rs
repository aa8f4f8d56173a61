//! Uniform operations over the five role profiles.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::Ctx;
use crate::error::{AppError, AppResult};
use crate::models::{
    Director, Headmaster, ListFilter, Owner, Profile, ProfileQuery, Student, Teacher,
};
use crate::repositories::ProfileRepository;
use crate::services::{Hydrator, ProvisioningWorkflow};

pub type DirectorService = ProfileService<Director>;
pub type HeadmasterService = ProfileService<Headmaster>;
pub type TeacherService = ProfileService<Teacher>;
pub type StudentService = ProfileService<Student>;
pub type OwnerService = ProfileService<Owner>;

/// Profile service for one role.
///
/// Reads return values with their user and scope relations filled.
#[derive(Clone)]
pub struct ProfileService<P: Profile> {
    workflow: ProvisioningWorkflow<P>,
    profiles: Arc<dyn ProfileRepository<P>>,
    hydrator: Hydrator,
}

impl<P: Profile> ProfileService<P> {
    pub fn new(
        workflow: ProvisioningWorkflow<P>,
        profiles: Arc<dyn ProfileRepository<P>>,
        hydrator: Hydrator,
    ) -> Self {
        Self {
            workflow,
            profiles,
            hydrator,
        }
    }

    /// Provisions a profile and returns it as subsequently read back.
    ///
    /// The read happens after the unit of work has committed and uses `ctx`.
    pub async fn add(&self, ctx: &Ctx, new: P::New) -> AppResult<P> {
        let created = self.workflow.provision(ctx, new).await?;
        self.by_id(ctx, created.id()).await
    }

    /// Gets a profile by its ID.
    ///
    /// # Returns
    /// The hydrated profile if found, or `NotFound` error
    pub async fn by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<P> {
        let profile = self
            .profiles
            .find_by_id(ctx, id)
            .await?
            .ok_or_else(|| AppError::not_found(P::ENTITY, "id", id))?;
        self.hydrator.one(ctx, profile).await
    }

    /// Lists profiles matching `query`.
    ///
    /// # Returns
    /// A tuple of (page, total matching rows)
    pub async fn list(
        &self,
        ctx: &Ctx,
        query: &ProfileQuery,
        filter: &ListFilter,
    ) -> AppResult<(Vec<P>, i64)> {
        let rows = self.profiles.list(ctx, query, filter).await?;
        let total = self.profiles.count(ctx, query).await?;
        let rows = self.hydrator.many(ctx, rows).await?;
        Ok((rows, total))
    }

    /// Number of profiles matching `query`.
    pub async fn count(&self, ctx: &Ctx, query: &ProfileQuery) -> AppResult<i64> {
        self.profiles.count(ctx, query).await
    }

    #[cfg(test)]
    pub(crate) fn workflow(&self) -> &ProvisioningWorkflow<P> {
        &self.workflow
    }
}
