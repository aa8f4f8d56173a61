//! Organizations, schools, grades and groups.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::Ctx;
use crate::error::{AppError, AppResult};
use crate::models::{
    EduOrganization, Grade, Group, GroupShortInfo, NewEduOrganization, NewGrade, NewGroup,
    NewSchool, School, SchoolShortInfo,
};
use crate::repositories::CatalogRepository;
use crate::services::Hydrator;

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    hydrator: Hydrator,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, hydrator: Hydrator) -> Self {
        Self { catalog, hydrator }
    }

    pub async fn add_organization(
        &self,
        ctx: &Ctx,
        new_organization: NewEduOrganization,
    ) -> AppResult<EduOrganization> {
        new_organization.validate()?;
        let organization = self.catalog.create_organization(ctx, new_organization).await?;
        info!(id = %organization.id, "Organization created");
        Ok(organization)
    }

    pub async fn add_school(&self, ctx: &Ctx, new_school: NewSchool) -> AppResult<School> {
        new_school.validate()?;
        let school = self.catalog.create_school(ctx, new_school).await?;
        info!(id = %school.id, organization_id = %school.organization_id, "School created");
        Ok(school)
    }

    /// # Errors
    /// `Duplicate` when the school already has a grade of that level.
    pub async fn add_grade(&self, ctx: &Ctx, new_grade: NewGrade) -> AppResult<Grade> {
        new_grade.validate()?;
        self.catalog.create_grade(ctx, new_grade).await
    }

    pub async fn add_group(&self, ctx: &Ctx, new_group: NewGroup) -> AppResult<Group> {
        new_group.validate()?;
        let group = self.catalog.create_group(ctx, new_group).await?;
        info!(id = %group.id, school_id = %group.school_id, "Group created");
        Ok(group)
    }

    /// School with its organization.
    pub async fn school_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<SchoolShortInfo> {
        let school = self
            .catalog
            .school_short_by_id(ctx, id)
            .await?
            .ok_or_else(|| AppError::not_found("schools", "id", id))?;
        self.hydrator.one(ctx, school).await
    }

    /// Groups with their grade and class teacher; unknown ids are skipped.
    pub async fn groups_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<GroupShortInfo>> {
        let groups = self.catalog.groups_by_ids(ctx, ids).await?;
        self.hydrator.many(ctx, groups).await
    }
}
