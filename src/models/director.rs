use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::profile::profile_accessors;
use crate::models::{
    Hydrate, Profile, RelationKeys, Related, Role, RoleScope, SchoolShortInfo, User,
};
use crate::utils::validate::PHONE_REGEX;

/// Head of a school.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Director {
    pub id: Uuid,
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub user: Option<User>,
    pub school: Option<SchoolShortInfo>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDirector {
    pub user_id: Uuid,
    pub school_id: Uuid,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl Profile for Director {
    const ROLE: Role = Role::Director;
    const ENTITY: &'static str = "directors";

    type New = NewDirector;

    fn new_user_id(new: &Self::New) -> Uuid {
        new.user_id
    }

    fn new_scope(new: &Self::New) -> RoleScope {
        RoleScope::school(new.school_id)
    }

    profile_accessors!(school_id);
}

impl Hydrate for Director {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.users.insert(self.user_id);
        keys.schools.insert(self.school_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            user: related.user(self.user_id),
            school: related.school(self.school_id),
            ..self
        }
    }
}
