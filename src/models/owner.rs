use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::profile::profile_accessors;
use crate::models::{
    EduOrganizationShortInfo, Hydrate, Profile, RelationKeys, Related, Role, RoleScope, User,
};
use crate::utils::validate::PHONE_REGEX;

/// Owner of an education organization. Scoped to the organization rather
/// than to a single school.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Owner {
    pub id: Uuid,
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub user: Option<User>,
    pub organization: Option<EduOrganizationShortInfo>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOwner {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl Profile for Owner {
    const ROLE: Role = Role::Owner;
    const ENTITY: &'static str = "owners";

    type New = NewOwner;

    fn new_user_id(new: &Self::New) -> Uuid {
        new.user_id
    }

    fn new_scope(new: &Self::New) -> RoleScope {
        RoleScope::organization(new.organization_id)
    }

    profile_accessors!(organization_id);
}

impl Hydrate for Owner {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.users.insert(self.user_id);
        keys.organizations.insert(self.organization_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            user: related.user(self.user_id),
            organization: related.organization(self.organization_id),
            ..self
        }
    }
}
