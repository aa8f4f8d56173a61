use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::rows::{NewUserRoleRow, NewUserRow, UserRoleRow, UserRow};
use super::{PgStore, db_error};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{NewUser, NewUserRole, User, UserRole};
use crate::repositories::{UserRepository, UserRoleRepository};
use crate::schema::{user_roles, users};

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, ctx: &Ctx, new_user: NewUser) -> AppResult<User> {
        const OPERATION: &str = "insert users";
        ctx.run(OPERATION, async {
            let row = NewUserRow::from(new_user);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn.get()?)
                .await
                .map(User::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<User>> {
        const OPERATION: &str = "select users by id";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            users::table
                .find(id)
                .select(UserRow::as_select())
                .first::<UserRow>(conn.get()?)
                .await
                .optional()
                .map(|row| row.map(User::from))
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn find_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<User>> {
        const OPERATION: &str = "select users by ids";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            users::table
                .filter(users::id.eq_any(ids))
                .select(UserRow::as_select())
                .load::<UserRow>(conn.get()?)
                .await
                .map(|rows| rows.into_iter().map(User::from).collect())
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn find_by_email(&self, ctx: &Ctx, email: &str) -> AppResult<Option<User>> {
        const OPERATION: &str = "select users by email";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            users::table
                .filter(users::email.eq(email))
                .select(UserRow::as_select())
                .first::<UserRow>(conn.get()?)
                .await
                .optional()
                .map(|row| row.map(User::from))
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }
}

#[async_trait]
impl UserRoleRepository for PgStore {
    async fn create(&self, ctx: &Ctx, new_role: NewUserRole) -> AppResult<UserRole> {
        const OPERATION: &str = "insert user_roles";
        ctx.run(OPERATION, async {
            let row = NewUserRoleRow::from(new_role);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(user_roles::table)
                .values(&row)
                .returning(UserRoleRow::as_returning())
                .get_result::<UserRoleRow>(conn.get()?)
                .await
                .map(UserRole::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<UserRole>> {
        const OPERATION: &str = "select user_roles by id";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            user_roles::table
                .find(id)
                .select(UserRoleRow::as_select())
                .first::<UserRoleRow>(conn.get()?)
                .await
                .optional()
                .map(|row| row.map(UserRole::from))
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn find_by_user(&self, ctx: &Ctx, user_id: Uuid) -> AppResult<Vec<UserRole>> {
        const OPERATION: &str = "select user_roles by user";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            user_roles::table
                .filter(user_roles::user_id.eq(user_id))
                .order((user_roles::created_at.asc(), user_roles::id.asc()))
                .select(UserRoleRow::as_select())
                .load::<UserRoleRow>(conn.get()?)
                .await
                .map(|rows| rows.into_iter().map(UserRole::from).collect())
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }
}
