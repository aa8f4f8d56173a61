//! Storage ports consumed by the services.
//!
//! Every method takes the caller's [`Ctx`]; when it carries a unit of work the
//! call participates in it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{
    EduOrganization, EduOrganizationShortInfo, Grade, Group, GroupShortInfo, GuardianQuery,
    ListFilter, NewEduOrganization, NewGrade, NewGroup, NewGuardianLink, NewProfile, NewSchool,
    NewUser, NewUserRole, Profile, ProfileQuery, School, SchoolShortInfo, StudentGuardian,
    StudentShortInfo, TeacherShortInfo, User, UserRole,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    /// `Duplicate` when the email is taken.
    async fn create(&self, ctx: &Ctx, new_user: NewUser) -> AppResult<User>;

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<User>>;

    /// Users for the given ids; unknown ids are skipped.
    async fn find_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<User>>;

    async fn find_by_email(&self, ctx: &Ctx, email: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// # Errors
    /// `RoleAlreadyAssigned` when the user already holds a non-guardian role
    /// in the same scope.
    async fn create(&self, ctx: &Ctx, new_role: NewUserRole) -> AppResult<UserRole>;

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<UserRole>>;

    /// Roles of a user ordered by creation time.
    async fn find_by_user(&self, ctx: &Ctx, user_id: Uuid) -> AppResult<Vec<UserRole>>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_organization(
        &self,
        ctx: &Ctx,
        new_organization: NewEduOrganization,
    ) -> AppResult<EduOrganization>;

    async fn create_school(&self, ctx: &Ctx, new_school: NewSchool) -> AppResult<School>;

    async fn create_grade(&self, ctx: &Ctx, new_grade: NewGrade) -> AppResult<Grade>;

    async fn create_group(&self, ctx: &Ctx, new_group: NewGroup) -> AppResult<Group>;

    async fn organizations_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<EduOrganizationShortInfo>>;

    async fn school_short_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<SchoolShortInfo>>;

    async fn schools_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<SchoolShortInfo>>;

    async fn grades_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<Grade>>;

    async fn groups_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<GroupShortInfo>>;
}

/// Name-bearing projections of teachers and students.
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn teachers_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<TeacherShortInfo>>;

    async fn students_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<StudentShortInfo>>;
}

/// Persistence of one profile type.
///
/// `list` and `count` take the same [`ProfileQuery`]; only `list` applies the
/// ordering and window of the [`ListFilter`].
#[async_trait]
pub trait ProfileRepository<P: Profile>: Send + Sync {
    /// # Errors
    /// `Duplicate` when the phone or email is already used by another profile
    /// of the same type.
    async fn create(&self, ctx: &Ctx, new_profile: NewProfile<P::New>) -> AppResult<P>;

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<P>>;

    async fn list(&self, ctx: &Ctx, query: &ProfileQuery, filter: &ListFilter)
    -> AppResult<Vec<P>>;

    async fn count(&self, ctx: &Ctx, query: &ProfileQuery) -> AppResult<i64>;
}

#[async_trait]
pub trait GuardianRepository: Send + Sync {
    /// # Errors
    /// `Duplicate` when the user is already a guardian of the student.
    async fn create(&self, ctx: &Ctx, link: NewGuardianLink) -> AppResult<StudentGuardian>;

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<StudentGuardian>>;

    async fn list(
        &self,
        ctx: &Ctx,
        query: &GuardianQuery,
        filter: &ListFilter,
    ) -> AppResult<Vec<StudentGuardian>>;

    async fn count(&self, ctx: &Ctx, query: &GuardianQuery) -> AppResult<i64>;
}
