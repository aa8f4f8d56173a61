//! Behaviour shared by the role profiles (director, headmaster, teacher,
//! student and owner).

use std::fmt::Debug;

use jiff::Timestamp;
use uuid::Uuid;
use validator::Validate;

use crate::models::{DateFilter, Hydrate, Role, RoleScope};

/// A role-scoped record attached to a user through a role row.
pub trait Profile: Hydrate + Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Role assigned to the user together with this profile.
    const ROLE: Role;
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Caller-supplied fields of a new profile.
    type New: Validate + Debug + Clone + Send + Sync + 'static;

    fn new_user_id(new: &Self::New) -> Uuid;

    fn new_scope(new: &Self::New) -> RoleScope;

    fn id(&self) -> Uuid;

    fn role_id(&self) -> Uuid;

    fn user_id(&self) -> Uuid;

    /// School id, or organization id for owners.
    fn scope_id(&self) -> Uuid;

    fn phone(&self) -> Option<&str>;

    fn email(&self) -> Option<&str>;

    fn created_at(&self) -> Timestamp;
}

/// Profile fields paired with the role row created for them.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile<N> {
    pub role_id: Uuid,
    pub fields: N,
}

/// Row predicate shared by a profile list and its count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileQuery {
    pub scope_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created: Option<DateFilter>,
}

impl ProfileQuery {
    pub fn in_scope(scope_id: Uuid) -> Self {
        Self {
            scope_id: Some(scope_id),
            ..Self::default()
        }
    }

    pub fn for_user(self, user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..self
        }
    }

    pub fn created_within(self, created: DateFilter) -> Self {
        Self {
            created: Some(created),
            ..self
        }
    }

    pub fn matches<P: Profile>(&self, profile: &P) -> bool {
        self.scope_id.is_none_or(|id| profile.scope_id() == id)
            && self.user_id.is_none_or(|id| profile.user_id() == id)
            && self
                .created
                .is_none_or(|created| created.contains(profile.created_at()))
    }
}

/// Implements the field accessors of [`Profile`] for a struct carrying the
/// common profile columns.
macro_rules! profile_accessors {
    ($scope:ident) => {
        fn id(&self) -> uuid::Uuid {
            self.id
        }

        fn role_id(&self) -> uuid::Uuid {
            self.role_id
        }

        fn user_id(&self) -> uuid::Uuid {
            self.user_id
        }

        fn scope_id(&self) -> uuid::Uuid {
            self.$scope
        }

        fn phone(&self) -> Option<&str> {
            self.phone.as_deref()
        }

        fn email(&self) -> Option<&str> {
            self.email.as_deref()
        }

        fn created_at(&self) -> jiff::Timestamp {
            self.created_at
        }
    };
}

pub(crate) use profile_accessors;
