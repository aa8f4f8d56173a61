use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::rows::{
    GradeRow, GroupRow, NewGradeRow, NewGroupRow, NewOrganizationRow, NewSchoolRow,
    OrganizationRow, SchoolRow,
};
use super::{PgStore, db_error};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{
    EduOrganization, EduOrganizationShortInfo, Grade, Group, GroupShortInfo, NewEduOrganization,
    NewGrade, NewGroup, NewSchool, School, SchoolShortInfo, StudentShortInfo, TeacherShortInfo,
};
use crate::repositories::{CatalogRepository, RosterRepository};
use crate::schema::{edu_organizations, grades, groups, schools, students, teachers, users};

#[async_trait]
impl CatalogRepository for PgStore {
    async fn create_organization(
        &self,
        ctx: &Ctx,
        new_organization: NewEduOrganization,
    ) -> AppResult<EduOrganization> {
        const OPERATION: &str = "insert edu_organizations";
        ctx.run(OPERATION, async {
            let row = NewOrganizationRow::from(new_organization);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(edu_organizations::table)
                .values(&row)
                .returning(OrganizationRow::as_returning())
                .get_result::<OrganizationRow>(conn.get()?)
                .await
                .map(EduOrganization::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn create_school(&self, ctx: &Ctx, new_school: NewSchool) -> AppResult<School> {
        const OPERATION: &str = "insert schools";
        ctx.run(OPERATION, async {
            let row = NewSchoolRow::from(new_school);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(schools::table)
                .values(&row)
                .returning(SchoolRow::as_returning())
                .get_result::<SchoolRow>(conn.get()?)
                .await
                .map(School::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn create_grade(&self, ctx: &Ctx, new_grade: NewGrade) -> AppResult<Grade> {
        const OPERATION: &str = "insert grades";
        ctx.run(OPERATION, async {
            let row = NewGradeRow::from(new_grade);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(grades::table)
                .values(&row)
                .returning(GradeRow::as_returning())
                .get_result::<GradeRow>(conn.get()?)
                .await
                .map(Grade::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn create_group(&self, ctx: &Ctx, new_group: NewGroup) -> AppResult<Group> {
        const OPERATION: &str = "insert groups";
        ctx.run(OPERATION, async {
            let row = NewGroupRow::from(new_group);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(groups::table)
                .values(&row)
                .returning(GroupRow::as_returning())
                .get_result::<GroupRow>(conn.get()?)
                .await
                .map(Group::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn organizations_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<EduOrganizationShortInfo>> {
        const OPERATION: &str = "select edu_organizations by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            edu_organizations::table
                .filter(edu_organizations::id.eq_any(ids))
                .select((edu_organizations::id, edu_organizations::name))
                .load::<(Uuid, String)>(conn.get()?)
                .await
                .map(|rows| {
                    rows.into_iter()
                        .map(|(id, name)| EduOrganizationShortInfo { id, name })
                        .collect()
                })
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn school_short_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<SchoolShortInfo>> {
        const OPERATION: &str = "select schools by id";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            schools::table
                .find(id)
                .select(SchoolRow::as_select())
                .first::<SchoolRow>(conn.get()?)
                .await
                .optional()
                .map(|row| row.map(|row| SchoolShortInfo::from(&School::from(row))))
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn schools_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<SchoolShortInfo>> {
        const OPERATION: &str = "select schools by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            schools::table
                .filter(schools::id.eq_any(ids))
                .select(SchoolRow::as_select())
                .load::<SchoolRow>(conn.get()?)
                .await
                .map(|rows| {
                    rows.into_iter()
                        .map(|row| SchoolShortInfo::from(&School::from(row)))
                        .collect()
                })
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn grades_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<Grade>> {
        const OPERATION: &str = "select grades by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            grades::table
                .filter(grades::id.eq_any(ids))
                .select(GradeRow::as_select())
                .load::<GradeRow>(conn.get()?)
                .await
                .map(|rows| rows.into_iter().map(Grade::from).collect())
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn groups_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<GroupShortInfo>> {
        const OPERATION: &str = "select groups by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            groups::table
                .filter(groups::id.eq_any(ids))
                .select(GroupRow::as_select())
                .load::<GroupRow>(conn.get()?)
                .await
                .map(|rows| {
                    rows.into_iter()
                        .map(|row| GroupShortInfo::from(&Group::from(row)))
                        .collect()
                })
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }
}

#[async_trait]
impl RosterRepository for PgStore {
    async fn teachers_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<TeacherShortInfo>> {
        const OPERATION: &str = "select teachers by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            teachers::table
                .inner_join(users::table)
                .filter(teachers::id.eq_any(ids))
                .select((
                    teachers::id,
                    teachers::user_id,
                    users::first_name,
                    users::last_name,
                ))
                .load::<(Uuid, Uuid, String, String)>(conn.get()?)
                .await
                .map(|rows| {
                    rows.into_iter()
                        .map(|(id, user_id, first_name, last_name)| TeacherShortInfo {
                            id,
                            user_id,
                            first_name,
                            last_name,
                        })
                        .collect()
                })
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn students_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<StudentShortInfo>> {
        const OPERATION: &str = "select students by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            students::table
                .inner_join(users::table)
                .filter(students::id.eq_any(ids))
                .select((
                    students::id,
                    students::user_id,
                    students::group_id,
                    users::first_name,
                    users::last_name,
                ))
                .load::<(Uuid, Uuid, Option<Uuid>, String, String)>(conn.get()?)
                .await
                .map(|rows| {
                    rows.into_iter()
                        .map(
                            |(id, user_id, group_id, first_name, last_name)| StudentShortInfo {
                                id,
                                user_id,
                                group_id,
                                first_name,
                                last_name,
                            },
                        )
                        .collect()
                })
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }
}
