use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::rows::{GuardianRow, NewGuardianRow};
use super::{PgStore, db_error};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{GuardianQuery, ListFilter, NewGuardianLink, SortOrder, StudentGuardian};
use crate::repositories::GuardianRepository;
use crate::schema::student_guardians;

fn filtered(query: &GuardianQuery) -> student_guardians::BoxedQuery<'static, Pg> {
    let mut statement = student_guardians::table.into_boxed();
    if let Some(student_id) = query.student_id {
        statement = statement.filter(student_guardians::student_id.eq(student_id));
    }
    if let Some(user_id) = query.user_id {
        statement = statement.filter(student_guardians::user_id.eq(user_id));
    }
    if let Some(created) = &query.created {
        if let Some(from) = created.from() {
            statement = statement
                .filter(student_guardians::created_at.ge(jiff_diesel::Timestamp::from(from)));
        }
        if let Some(till) = created.till() {
            statement = statement
                .filter(student_guardians::created_at.lt(jiff_diesel::Timestamp::from(till)));
        }
    }
    statement
}

#[async_trait]
impl GuardianRepository for PgStore {
    async fn create(&self, ctx: &Ctx, link: NewGuardianLink) -> AppResult<StudentGuardian> {
        const OPERATION: &str = "insert student_guardians";
        ctx.run(OPERATION, async {
            let row = NewGuardianRow::from(link);
            let mut conn = self.conn(ctx).await?;
            diesel::insert_into(student_guardians::table)
                .values(&row)
                .returning(GuardianRow::as_returning())
                .get_result::<GuardianRow>(conn.get()?)
                .await
                .map(StudentGuardian::from)
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<StudentGuardian>> {
        const OPERATION: &str = "select student_guardians by id";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            student_guardians::table
                .find(id)
                .select(GuardianRow::as_select())
                .first::<GuardianRow>(conn.get()?)
                .await
                .optional()
                .map(|row| row.map(StudentGuardian::from))
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn list(
        &self,
        ctx: &Ctx,
        query: &GuardianQuery,
        filter: &ListFilter,
    ) -> AppResult<Vec<StudentGuardian>> {
        const OPERATION: &str = "list student_guardians";
        ctx.run(OPERATION, async {
            let statement = match filter.sort_order() {
                SortOrder::Asc => filtered(query).order((
                    student_guardians::created_at.asc(),
                    student_guardians::id.asc(),
                )),
                SortOrder::Desc => filtered(query).order((
                    student_guardians::created_at.desc(),
                    student_guardians::id.desc(),
                )),
            };
            let statement = match filter.pagination() {
                Some(page) => statement.limit(page.limit()).offset(page.offset()),
                None => statement,
            };

            let mut conn = self.conn(ctx).await?;
            statement
                .select(GuardianRow::as_select())
                .load::<GuardianRow>(conn.get()?)
                .await
                .map(|rows| rows.into_iter().map(StudentGuardian::from).collect())
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }

    async fn count(&self, ctx: &Ctx, query: &GuardianQuery) -> AppResult<i64> {
        const OPERATION: &str = "count student_guardians";
        ctx.run(OPERATION, async {
            let mut conn = self.conn(ctx).await?;
            filtered(query)
                .count()
                .get_result::<i64>(conn.get()?)
                .await
                .map_err(|e| db_error(e, OPERATION))
        })
        .await
    }
}
