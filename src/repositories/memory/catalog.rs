use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use super::{MemoryStore, duplicate, invalid_reference, pick};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{
    EduOrganization, EduOrganizationShortInfo, Grade, Group, GroupShortInfo, NewEduOrganization,
    NewGrade, NewGroup, NewSchool, School, SchoolShortInfo, StudentShortInfo, TeacherShortInfo,
};
use crate::repositories::{CatalogRepository, RosterRepository};

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_organization(
        &self,
        ctx: &Ctx,
        new_organization: NewEduOrganization,
    ) -> AppResult<EduOrganization> {
        self.with_tables(ctx, "insert edu_organizations", move |tables| {
            let now = Timestamp::now();
            let organization = EduOrganization {
                id: Uuid::new_v4(),
                name: new_organization.name,
                created_at: now,
                updated_at: now,
            };
            tables
                .organizations
                .insert(organization.id, organization.clone());
            Ok(organization)
        })
        .await
    }

    async fn create_school(&self, ctx: &Ctx, new_school: NewSchool) -> AppResult<School> {
        self.with_tables(ctx, "insert schools", move |tables| {
            if !tables.organizations.contains_key(&new_school.organization_id) {
                return Err(invalid_reference(
                    "schools",
                    "organization_id",
                    new_school.organization_id,
                ));
            }
            let now = Timestamp::now();
            let school = School {
                id: Uuid::new_v4(),
                organization_id: new_school.organization_id,
                name: new_school.name,
                created_at: now,
                updated_at: now,
            };
            tables.schools.insert(school.id, school.clone());
            Ok(school)
        })
        .await
    }

    async fn create_grade(&self, ctx: &Ctx, new_grade: NewGrade) -> AppResult<Grade> {
        self.with_tables(ctx, "insert grades", move |tables| {
            if !tables.schools.contains_key(&new_grade.school_id) {
                return Err(invalid_reference("grades", "school_id", new_grade.school_id));
            }
            let taken = tables.grades.values().any(|grade| {
                grade.school_id == new_grade.school_id && grade.level == new_grade.level
            });
            if taken {
                return Err(duplicate(
                    "grades",
                    "school_id, level",
                    format!("{}, {}", new_grade.school_id, new_grade.level),
                ));
            }
            let grade = Grade {
                id: Uuid::new_v4(),
                school_id: new_grade.school_id,
                level: new_grade.level,
                name: new_grade.name,
            };
            tables.grades.insert(grade.id, grade.clone());
            Ok(grade)
        })
        .await
    }

    async fn create_group(&self, ctx: &Ctx, new_group: NewGroup) -> AppResult<Group> {
        self.with_tables(ctx, "insert groups", move |tables| {
            if !tables.schools.contains_key(&new_group.school_id) {
                return Err(invalid_reference("groups", "school_id", new_group.school_id));
            }
            if !tables.grades.contains_key(&new_group.grade_id) {
                return Err(invalid_reference("groups", "grade_id", new_group.grade_id));
            }
            if let Some(teacher_id) = new_group
                .class_teacher_id
                .filter(|id| !tables.teachers.contains_key(id))
            {
                return Err(invalid_reference("groups", "class_teacher_id", teacher_id));
            }
            let now = Timestamp::now();
            let group = Group {
                id: Uuid::new_v4(),
                school_id: new_group.school_id,
                grade_id: new_group.grade_id,
                class_teacher_id: new_group.class_teacher_id,
                name: new_group.name,
                created_at: now,
                updated_at: now,
            };
            tables.groups.insert(group.id, group.clone());
            Ok(group)
        })
        .await
    }

    async fn organizations_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<EduOrganizationShortInfo>> {
        self.with_tables(ctx, "select edu_organizations by ids", |tables| {
            Ok(pick(&tables.organizations, ids)
                .iter()
                .map(EduOrganizationShortInfo::from)
                .collect())
        })
        .await
    }

    async fn school_short_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<SchoolShortInfo>> {
        self.with_tables(ctx, "select schools by id", move |tables| {
            Ok(tables.schools.get(&id).map(SchoolShortInfo::from))
        })
        .await
    }

    async fn schools_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<SchoolShortInfo>> {
        self.with_tables(ctx, "select schools by ids", |tables| {
            Ok(pick(&tables.schools, ids)
                .iter()
                .map(SchoolShortInfo::from)
                .collect())
        })
        .await
    }

    async fn grades_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<Grade>> {
        self.with_tables(ctx, "select grades by ids", |tables| {
            Ok(pick(&tables.grades, ids))
        })
        .await
    }

    async fn groups_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<GroupShortInfo>> {
        self.with_tables(ctx, "select groups by ids", |tables| {
            Ok(pick(&tables.groups, ids)
                .iter()
                .map(GroupShortInfo::from)
                .collect())
        })
        .await
    }
}

#[async_trait]
impl RosterRepository for MemoryStore {
    async fn teachers_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<TeacherShortInfo>> {
        self.with_tables(ctx, "select teachers by ids", |tables| {
            Ok(ids
                .iter()
                .filter_map(|id| tables.teachers.get(id))
                .filter_map(|teacher| {
                    let user = tables.users.get(&teacher.user_id)?;
                    Some(TeacherShortInfo {
                        id: teacher.id,
                        user_id: teacher.user_id,
                        first_name: user.first_name.clone(),
                        last_name: user.last_name.clone(),
                    })
                })
                .collect())
        })
        .await
    }

    async fn students_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<StudentShortInfo>> {
        self.with_tables(ctx, "select students by ids", |tables| {
            Ok(ids
                .iter()
                .filter_map(|id| tables.students.get(id))
                .filter_map(|student| {
                    let user = tables.users.get(&student.user_id)?;
                    Some(StudentShortInfo {
                        id: student.id,
                        user_id: student.user_id,
                        group_id: student.group_id,
                        first_name: user.first_name.clone(),
                        last_name: user.last_name.clone(),
                    })
                })
                .collect())
        })
        .await
    }
}
