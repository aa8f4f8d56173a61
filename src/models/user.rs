use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    EduOrganizationShortInfo, GroupShortInfo, Hydrate, RelationKeys, Related, Role,
    SchoolShortInfo,
};
use crate::models::Gender;
use crate::utils::validate::PHONE_REGEX;

/// Shared identity behind every role profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a user; the password arrives already hashed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 100))]
    pub middle_name: Option<String>,
    pub gender: Gender,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password_hash: String,
}

/// Scope columns of a role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleScope {
    pub school_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

impl RoleScope {
    pub fn school(school_id: Uuid) -> Self {
        Self {
            school_id: Some(school_id),
            ..Self::default()
        }
    }

    pub fn organization(organization_id: Uuid) -> Self {
        Self {
            organization_id: Some(organization_id),
            ..Self::default()
        }
    }

    pub fn with_group(self, group_id: Option<Uuid>) -> Self {
        Self { group_id, ..self }
    }

    /// Column participating in the role uniqueness key.
    pub fn key(&self) -> Option<Uuid> {
        self.school_id.or(self.organization_id)
    }
}

/// Assignment of a role to a user within a school or organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub school_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub school: Option<SchoolShortInfo>,
    pub organization: Option<EduOrganizationShortInfo>,
    pub group: Option<GroupShortInfo>,
}

impl UserRole {
    pub fn scope(&self) -> RoleScope {
        RoleScope {
            school_id: self.school_id,
            organization_id: self.organization_id,
            group_id: self.group_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRole {
    pub user_id: Uuid,
    pub role: Role,
    pub scope: RoleScope,
}

impl Hydrate for UserRole {
    fn collect_keys(&self, keys: &mut RelationKeys) {
        keys.schools.extend(self.school_id);
        keys.organizations.extend(self.organization_id);
        keys.groups.extend(self.group_id);
    }

    fn hydrate(self, related: &Related) -> Self {
        Self {
            school: self.school_id.and_then(|id| related.school(id)),
            organization: self.organization_id.and_then(|id| related.organization(id)),
            group: self.group_id.and_then(|id| related.group(id)),
            ..self
        }
    }
}
