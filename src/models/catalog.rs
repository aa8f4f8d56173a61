//! Organizations, schools, grades and groups, plus the read-only short-info
//! projections other aggregates embed.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Hydrate, RelationKeys, Related};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EduOrganization {
    pub id: Uuid,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEduOrganization {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct School {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSchool {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

/// A year level inside a school, e.g. level 5 named "5th grade".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grade {
    pub id: Uuid,
    pub school_id: Uuid,
    pub level: i16,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGrade {
    pub school_id: Uuid,
    #[validate(range(min = 1, max = 12))]
    pub level: i16,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// A class of students inside a grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub school_id: Uuid,
    pub grade_id: Uuid,
    pub class_teacher_id: Option<Uuid>,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGroup {
    pub school_id: Uuid,
    pub grade_id: Uuid,
    pub class_teacher_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EduOrganizationShortInfo {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolShortInfo {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub organization: Option<EduOrganizationShortInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherShortInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentShortInfo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupShortInfo {
    pub id: Uuid,
    pub grade_id: Uuid,
    pub class_teacher_id: Option<Uuid>,
    pub name: String,
    pub grade: Option<Grade>,
    pub class_teacher: Option<TeacherShortInfo>,
}

impl From<&EduOrganization> for EduOrganizationShortInfo {
    fn from(organization: &EduOrganization) -> Self {
        Self {
            id: organization.id,
            name: organization.name.clone(),
        }
    }
}

impl From<&School> for SchoolShortInfo {
    fn from(school: &School) -> Self {
        Self {
            id: school.id,
            organization_id: school.organization_id,
            name: school.name.clone(),
            organization: None,
        }
    }
}

impl From<&Group> for GroupShortInfo {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            grade_id: group.grade_id,
            class_teacher_id: group.class_teacher_id,
            name: group.name.clone(),
            grade: None,
            class_teacher: None,
        }
    }
}

impl Hydrate for SchoolShortInfo {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.organizations.insert(self.organization_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            organization: related.organization(self.organization_id),
            ..self
        }
    }
}

impl Hydrate for GroupShortInfo {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.grades.insert(self.grade_id);
        keys.teachers.extend(self.class_teacher_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            grade: related.grade(self.grade_id),
            class_teacher: self.class_teacher_id.and_then(|id| related.teacher(id)),
            ..self
        }
    }
}
