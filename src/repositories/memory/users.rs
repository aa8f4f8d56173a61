use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use super::{MemoryStore, duplicate, invalid_reference, pick};
use crate::db::Ctx;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, NewUserRole, User, UserRole};
use crate::repositories::{UserRepository, UserRoleRepository};

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, ctx: &Ctx, new_user: NewUser) -> AppResult<User> {
        self.with_tables(ctx, "insert users", move |tables| {
            if tables.users.values().any(|user| user.email == new_user.email) {
                return Err(duplicate("users", "email", &new_user.email));
            }
            let now = Timestamp::now();
            let user = User {
                id: Uuid::new_v4(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                middle_name: new_user.middle_name,
                gender: new_user.gender,
                phone: new_user.phone,
                email: new_user.email,
                password_hash: new_user.password_hash,
                created_at: now,
                updated_at: now,
            };
            tables.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<User>> {
        self.with_tables(ctx, "select users by id", move |tables| {
            Ok(tables.users.get(&id).cloned())
        })
        .await
    }

    async fn find_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<User>> {
        self.with_tables(ctx, "select users by ids", |tables| {
            Ok(pick(&tables.users, ids))
        })
        .await
    }

    async fn find_by_email(&self, ctx: &Ctx, email: &str) -> AppResult<Option<User>> {
        self.with_tables(ctx, "select users by email", |tables| {
            Ok(tables.users.values().find(|user| user.email == email).cloned())
        })
        .await
    }
}

#[async_trait]
impl UserRoleRepository for MemoryStore {
    async fn create(&self, ctx: &Ctx, new_role: NewUserRole) -> AppResult<UserRole> {
        self.with_tables(ctx, "insert user_roles", move |tables| {
            let NewUserRole {
                user_id,
                role,
                scope,
            } = new_role;

            if !tables.users.contains_key(&user_id) {
                return Err(invalid_reference("user_roles", "user_id", user_id));
            }
            if let Some(school_id) = scope.school_id.filter(|id| !tables.schools.contains_key(id)) {
                return Err(invalid_reference("user_roles", "school_id", school_id));
            }
            if let Some(organization_id) = scope
                .organization_id
                .filter(|id| !tables.organizations.contains_key(id))
            {
                return Err(invalid_reference("user_roles", "organization_id", organization_id));
            }
            if let Some(group_id) = scope.group_id.filter(|id| !tables.groups.contains_key(id)) {
                return Err(invalid_reference("user_roles", "group_id", group_id));
            }

            // Rows without a scope never collide, matching NULL semantics of the index.
            let taken = role.is_scope_unique()
                && scope.key().is_some()
                && tables.user_roles.values().any(|existing| {
                    existing.user_id == user_id
                        && existing.role == role
                        && existing.scope().key() == scope.key()
                });
            if taken {
                return Err(AppError::RoleAlreadyAssigned {
                    user_id,
                    role,
                    scope_id: scope.key(),
                });
            }

            let now = Timestamp::now();
            let user_role = UserRole {
                id: Uuid::new_v4(),
                user_id,
                role,
                school_id: scope.school_id,
                organization_id: scope.organization_id,
                group_id: scope.group_id,
                created_at: now,
                updated_at: now,
                school: None,
                organization: None,
                group: None,
            };
            tables.user_roles.insert(user_role.id, user_role.clone());
            Ok(user_role)
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<UserRole>> {
        self.with_tables(ctx, "select user_roles by id", move |tables| {
            Ok(tables.user_roles.get(&id).cloned())
        })
        .await
    }

    async fn find_by_user(&self, ctx: &Ctx, user_id: Uuid) -> AppResult<Vec<UserRole>> {
        self.with_tables(ctx, "select user_roles by user", move |tables| {
            let mut roles: Vec<UserRole> = tables
                .user_roles
                .values()
                .filter(|role| role.user_id == user_id)
                .cloned()
                .collect();
            roles.sort_by_key(|role| (role.created_at, role.id));
            Ok(roles)
        })
        .await
    }
}
