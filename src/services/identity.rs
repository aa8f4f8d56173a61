//! Users and their role assignments.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::db::Ctx;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, NewUserRole, Role, RoleScope, ScopeKind, User, UserRole};
use crate::repositories::{UserRepository, UserRoleRepository};
use crate::services::Hydrator;

/// Identity service for users and role rows.
///
/// Cloning is cheap; the repositories are shared behind `Arc`.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    user_roles: Arc<dyn UserRoleRepository>,
    hydrator: Hydrator,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        user_roles: Arc<dyn UserRoleRepository>,
        hydrator: Hydrator,
    ) -> Self {
        Self {
            users,
            user_roles,
            hydrator,
        }
    }

    /// Creates a new user.
    ///
    /// # Errors
    /// `Validation` for malformed input, `Duplicate` when the email is taken.
    pub async fn add_user(&self, ctx: &Ctx, new_user: NewUser) -> AppResult<User> {
        new_user.validate()?;
        let user = self.users.create(ctx, new_user).await?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Gets a user by their ID.
    ///
    /// # Returns
    /// The user if found, or `NotFound` error
    pub async fn user_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(ctx, id)
            .await?
            .ok_or_else(|| AppError::not_found("user", "id", id))
    }

    /// Assigns `role` to a user within `scope`.
    ///
    /// Runs inside the unit of work carried by `ctx`, if any.
    ///
    /// # Errors
    /// `BadRequest` when the scope does not fit the role,
    /// `RoleAlreadyAssigned` when the user already holds the role there.
    pub async fn add_role_to_user(
        &self,
        ctx: &Ctx,
        user_id: Uuid,
        role: Role,
        scope: RoleScope,
    ) -> AppResult<UserRole> {
        check_scope(role, &scope)?;
        let user_role = self
            .user_roles
            .create(
                ctx,
                NewUserRole {
                    user_id,
                    role,
                    scope,
                },
            )
            .await?;
        debug!(%user_id, %role, role_id = %user_role.id, "Role assigned");
        Ok(user_role)
    }

    /// Roles held by a user with their school, organization and group.
    pub async fn roles_of_user(&self, ctx: &Ctx, user_id: Uuid) -> AppResult<Vec<UserRole>> {
        let roles = self.user_roles.find_by_user(ctx, user_id).await?;
        self.hydrator.many(ctx, roles).await
    }
}

/// A role is scoped to a school or to an organization, never both.
fn check_scope(role: Role, scope: &RoleScope) -> AppResult<()> {
    let fits = match role.scope_kind() {
        ScopeKind::School => scope.organization_id.is_none(),
        ScopeKind::Organization => scope.school_id.is_none() && scope.group_id.is_none(),
    };
    if !fits {
        return Err(AppError::bad_request(format!(
            "Role '{role}' cannot be scoped to {scope:?}"
        )));
    }
    if scope.group_id.is_some() && scope.school_id.is_none() {
        return Err(AppError::bad_request("A group scope requires a school"));
    }
    Ok(())
}
