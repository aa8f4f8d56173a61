use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::profile::profile_accessors;
use crate::models::{
    GroupShortInfo, Hydrate, Profile, RelationKeys, Related, Role, RoleScope, SchoolShortInfo,
    User,
};
use crate::utils::validate::PHONE_REGEX;

/// Learner enrolled in a school and, once placed, in one of its groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: Uuid,
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub group_id: Option<Uuid>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub user: Option<User>,
    pub school: Option<SchoolShortInfo>,
    pub group: Option<GroupShortInfo>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewStudent {
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub group_id: Option<Uuid>,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl Profile for Student {
    const ROLE: Role = Role::Student;
    const ENTITY: &'static str = "students";

    type New = NewStudent;

    fn new_user_id(new: &Self::New) -> Uuid {
        new.user_id
    }

    // The role row records the group so role listings can show the class.
    fn new_scope(new: &Self::New) -> RoleScope {
        RoleScope::school(new.school_id).with_group(new.group_id)
    }

    profile_accessors!(school_id);
}

impl Hydrate for Student {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.users.insert(self.user_id);
        keys.schools.insert(self.school_id);
        keys.groups.extend(self.group_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            user: related.user(self.user_id),
            school: related.school(self.school_id),
            group: self.group_id.and_then(|id| related.group(id)),
            ..self
        }
    }
}
