//! Diesel row types and their conversions into domain models.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::models::{
    Director, EduOrganization, Gender, Grade, Group, GuardianRelation, Headmaster,
    NewEduOrganization, NewGrade, NewGroup, NewGuardianLink, NewProfile, NewSchool, NewStudent,
    NewUser, NewUserRole, Owner, Role, School, Student, StudentGuardian, Teacher, User, UserRole,
};
use crate::models::{NewDirector, NewHeadmaster, NewOwner, NewTeacher};
use crate::schema::{
    directors, edu_organizations, grades, groups, headmasters, owners, schools, student_guardians,
    students, teachers, user_roles, users,
};

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    gender: Gender,
    phone: Option<String>,
    email: String,
    password_hash: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            middle_name: row.middle_name,
            gender: row.gender,
            phone: row.phone,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(super) struct NewUserRow {
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    gender: Gender,
    phone: Option<String>,
    email: String,
    password_hash: String,
}

impl From<NewUser> for NewUserRow {
    fn from(new_user: NewUser) -> Self {
        Self {
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            middle_name: new_user.middle_name,
            gender: new_user.gender,
            phone: new_user.phone,
            email: new_user.email,
            password_hash: new_user.password_hash,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = user_roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct UserRoleRow {
    id: Uuid,
    user_id: Uuid,
    role: Role,
    school_id: Option<Uuid>,
    organization_id: Option<Uuid>,
    group_id: Option<Uuid>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<UserRoleRow> for UserRole {
    fn from(row: UserRoleRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            role: row.role,
            school_id: row.school_id,
            organization_id: row.organization_id,
            group_id: row.group_id,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
            school: None,
            organization: None,
            group: None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_roles)]
pub(super) struct NewUserRoleRow {
    user_id: Uuid,
    role: Role,
    school_id: Option<Uuid>,
    organization_id: Option<Uuid>,
    group_id: Option<Uuid>,
}

impl From<NewUserRole> for NewUserRoleRow {
    fn from(new_role: NewUserRole) -> Self {
        Self {
            user_id: new_role.user_id,
            role: new_role.role,
            school_id: new_role.scope.school_id,
            organization_id: new_role.scope.organization_id,
            group_id: new_role.scope.group_id,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = edu_organizations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct OrganizationRow {
    id: Uuid,
    name: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<OrganizationRow> for EduOrganization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = edu_organizations)]
pub(super) struct NewOrganizationRow {
    name: String,
}

impl From<NewEduOrganization> for NewOrganizationRow {
    fn from(new_organization: NewEduOrganization) -> Self {
        Self {
            name: new_organization.name,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schools)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct SchoolRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<SchoolRow> for School {
    fn from(row: SchoolRow) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schools)]
pub(super) struct NewSchoolRow {
    organization_id: Uuid,
    name: String,
}

impl From<NewSchool> for NewSchoolRow {
    fn from(new_school: NewSchool) -> Self {
        Self {
            organization_id: new_school.organization_id,
            name: new_school.name,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = grades)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct GradeRow {
    id: Uuid,
    school_id: Uuid,
    level: i16,
    name: String,
}

impl From<GradeRow> for Grade {
    fn from(row: GradeRow) -> Self {
        Self {
            id: row.id,
            school_id: row.school_id,
            level: row.level,
            name: row.name,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = grades)]
pub(super) struct NewGradeRow {
    school_id: Uuid,
    level: i16,
    name: String,
}

impl From<NewGrade> for NewGradeRow {
    fn from(new_grade: NewGrade) -> Self {
        Self {
            school_id: new_grade.school_id,
            level: new_grade.level,
            name: new_grade.name,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct GroupRow {
    id: Uuid,
    school_id: Uuid,
    grade_id: Uuid,
    class_teacher_id: Option<Uuid>,
    name: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            school_id: row.school_id,
            grade_id: row.grade_id,
            class_teacher_id: row.class_teacher_id,
            name: row.name,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = groups)]
pub(super) struct NewGroupRow {
    school_id: Uuid,
    grade_id: Uuid,
    class_teacher_id: Option<Uuid>,
    name: String,
}

impl From<NewGroup> for NewGroupRow {
    fn from(new_group: NewGroup) -> Self {
        Self {
            school_id: new_group.school_id,
            grade_id: new_group.grade_id,
            class_teacher_id: new_group.class_teacher_id,
            name: new_group.name,
        }
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Row and insert types for the profiles scoped to a single school.
macro_rules! school_profile_rows {
    ($table:ident, $row:ident, $new_row:ident, $profile:ident, $new:ident) => {
        #[derive(Debug, Queryable, Selectable)]
        #[diesel(table_name = $table)]
        #[diesel(check_for_backend(diesel::pg::Pg))]
        pub(super) struct $row {
            id: Uuid,
            role_id: Uuid,
            user_id: Uuid,
            school_id: Uuid,
            phone: Option<String>,
            email: Option<String>,
            created_at: Timestamp,
            updated_at: Timestamp,
        }

        impl From<$row> for $profile {
            fn from(row: $row) -> Self {
                Self {
                    id: row.id,
                    role_id: row.role_id,
                    user_id: row.user_id,
                    school_id: row.school_id,
                    phone: row.phone,
                    email: row.email,
                    created_at: row.created_at.into(),
                    updated_at: row.updated_at.into(),
                    user: None,
                    school: None,
                }
            }
        }

        #[derive(Debug, Insertable)]
        #[diesel(table_name = $table)]
        pub(super) struct $new_row {
            role_id: Uuid,
            user_id: Uuid,
            school_id: Uuid,
            phone: Option<String>,
            email: Option<String>,
        }

        impl From<NewProfile<$new>> for $new_row {
            fn from(new_profile: NewProfile<$new>) -> Self {
                Self {
                    role_id: new_profile.role_id,
                    user_id: new_profile.fields.user_id,
                    school_id: new_profile.fields.school_id,
                    phone: new_profile.fields.phone,
                    email: new_profile.fields.email,
                }
            }
        }
    };
}

school_profile_rows!(directors, DirectorRow, NewDirectorRow, Director, NewDirector);
school_profile_rows!(headmasters, HeadmasterRow, NewHeadmasterRow, Headmaster, NewHeadmaster);
school_profile_rows!(teachers, TeacherRow, NewTeacherRow, Teacher, NewTeacher);

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct StudentRow {
    id: Uuid,
    role_id: Uuid,
    user_id: Uuid,
    school_id: Uuid,
    group_id: Option<Uuid>,
    phone: Option<String>,
    email: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: row.id,
            role_id: row.role_id,
            user_id: row.user_id,
            school_id: row.school_id,
            group_id: row.group_id,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
            user: None,
            school: None,
            group: None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = students)]
pub(super) struct NewStudentRow {
    role_id: Uuid,
    user_id: Uuid,
    school_id: Uuid,
    group_id: Option<Uuid>,
    phone: Option<String>,
    email: Option<String>,
}

impl From<NewProfile<NewStudent>> for NewStudentRow {
    fn from(new_profile: NewProfile<NewStudent>) -> Self {
        let fields = new_profile.fields;
        Self {
            role_id: new_profile.role_id,
            user_id: fields.user_id,
            school_id: fields.school_id,
            group_id: fields.group_id,
            phone: fields.phone,
            email: fields.email,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = owners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct OwnerRow {
    id: Uuid,
    role_id: Uuid,
    user_id: Uuid,
    organization_id: Uuid,
    phone: Option<String>,
    email: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<OwnerRow> for Owner {
    fn from(row: OwnerRow) -> Self {
        Self {
            id: row.id,
            role_id: row.role_id,
            user_id: row.user_id,
            organization_id: row.organization_id,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
            user: None,
            organization: None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = owners)]
pub(super) struct NewOwnerRow {
    role_id: Uuid,
    user_id: Uuid,
    organization_id: Uuid,
    phone: Option<String>,
    email: Option<String>,
}

impl From<NewProfile<NewOwner>> for NewOwnerRow {
    fn from(new_profile: NewProfile<NewOwner>) -> Self {
        let fields = new_profile.fields;
        Self {
            role_id: new_profile.role_id,
            user_id: fields.user_id,
            organization_id: fields.organization_id,
            phone: fields.phone,
            email: fields.email,
        }
    }
}

// ============================================================================
// Guardians
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = student_guardians)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(super) struct GuardianRow {
    id: Uuid,
    role_id: Uuid,
    user_id: Uuid,
    student_id: Uuid,
    relation: GuardianRelation,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<GuardianRow> for StudentGuardian {
    fn from(row: GuardianRow) -> Self {
        Self {
            id: row.id,
            role_id: row.role_id,
            user_id: row.user_id,
            student_id: row.student_id,
            relation: row.relation,
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
            user: None,
            student: None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = student_guardians)]
pub(super) struct NewGuardianRow {
    role_id: Uuid,
    user_id: Uuid,
    student_id: Uuid,
    relation: GuardianRelation,
}

impl From<NewGuardianLink> for NewGuardianRow {
    fn from(link: NewGuardianLink) -> Self {
        Self {
            role_id: link.role_id,
            user_id: link.user_id,
            student_id: link.student_id,
            relation: link.relation,
        }
    }
}
