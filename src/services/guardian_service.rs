//! Guardians of students.
//!
//! A guardian holds one guardian role row per student, scoped to the
//! student's school. Guardian roles are exempt from the one-role-per-scope
//! rule, so a parent of two children in one school holds two rows.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::{Ctx, UnitOfWorkCoordinator};
use crate::error::{AppError, AppResult, ResultExt};
use crate::models::{
    GuardianQuery, ListFilter, NewGuardianLink, NewStudentGuardian, Role, RoleScope, Student,
    StudentGuardian,
};
use crate::repositories::{GuardianRepository, ProfileRepository};
use crate::services::{Hydrator, IdentityService};

#[derive(Clone)]
pub struct GuardianService {
    coordinator: UnitOfWorkCoordinator,
    identity: IdentityService,
    students: Arc<dyn ProfileRepository<Student>>,
    guardians: Arc<dyn GuardianRepository>,
    hydrator: Hydrator,
}

impl GuardianService {
    pub fn new(
        coordinator: UnitOfWorkCoordinator,
        identity: IdentityService,
        students: Arc<dyn ProfileRepository<Student>>,
        guardians: Arc<dyn GuardianRepository>,
        hydrator: Hydrator,
    ) -> Self {
        Self {
            coordinator,
            identity,
            students,
            guardians,
            hydrator,
        }
    }

    /// Makes a user a guardian of a student.
    ///
    /// # Errors
    /// `NotFound` when the student does not exist, `Duplicate` when the user
    /// already guards the student.
    pub async fn assign_student_guardian(
        &self,
        ctx: &Ctx,
        new: NewStudentGuardian,
    ) -> AppResult<StudentGuardian> {
        new.validate()?;

        let (tx_ctx, tx) = self.coordinator.begin(ctx).await?;
        let result = self.assign_in(&tx_ctx, new).await;
        let link = self.coordinator.end(tx, result).await?;

        info!(
            id = %link.id,
            user_id = %link.user_id,
            student_id = %link.student_id,
            "Guardian assigned"
        );
        self.by_id(ctx, link.id).await
    }

    async fn assign_in(&self, tx_ctx: &Ctx, new: NewStudentGuardian) -> AppResult<StudentGuardian> {
        let student = self
            .students
            .find_by_id(tx_ctx, new.student_id)
            .await?
            .ok_or_else(|| AppError::not_found("students", "id", new.student_id))?;

        let role = self
            .identity
            .add_role_to_user(
                tx_ctx,
                new.user_id,
                Role::Guardian,
                RoleScope::school(student.school_id),
            )
            .await
            .context("assign guardian role")?;

        self.guardians
            .create(
                tx_ctx,
                NewGuardianLink {
                    role_id: role.id,
                    user_id: new.user_id,
                    student_id: new.student_id,
                    relation: new.relation,
                },
            )
            .await
            .context("create student_guardians")
    }

    pub async fn by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<StudentGuardian> {
        let link = self
            .guardians
            .find_by_id(ctx, id)
            .await?
            .ok_or_else(|| AppError::not_found("student_guardians", "id", id))?;
        self.hydrator.one(ctx, link).await
    }

    /// Lists guardian links matching `query` with the total count.
    pub async fn list(
        &self,
        ctx: &Ctx,
        query: &GuardianQuery,
        filter: &ListFilter,
    ) -> AppResult<(Vec<StudentGuardian>, i64)> {
        let rows = self.guardians.list(ctx, query, filter).await?;
        let total = self.guardians.count(ctx, query).await?;
        let rows = self.hydrator.many(ctx, rows).await?;
        Ok((rows, total))
    }
}
