use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    DateFilter, GuardianRelation, Hydrate, RelationKeys, Related, StudentShortInfo, User,
};

/// Link between a guardian user and a student they are responsible for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentGuardian {
    pub id: Uuid,
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub relation: GuardianRelation,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub user: Option<User>,
    pub student: Option<StudentShortInfo>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewStudentGuardian {
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub relation: GuardianRelation,
}

/// Guardian link ready to persist, carrying its role row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGuardianLink {
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub relation: GuardianRelation,
}

/// Row predicate shared by a guardian list and its count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardianQuery {
    pub student_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created: Option<DateFilter>,
}

impl GuardianQuery {
    pub fn of_student(student_id: Uuid) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, link: &StudentGuardian) -> bool {
        self.student_id.is_none_or(|id| link.student_id == id)
            && self.user_id.is_none_or(|id| link.user_id == id)
            && self
                .created
                .is_none_or(|created| created.contains(link.created_at))
    }
}

impl Hydrate for StudentGuardian {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.users.insert(self.user_id);
        keys.students.insert(self.student_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            user: related.user(self.user_id),
            student: related.student(self.student_id),
            ..self
        }
    }
}
