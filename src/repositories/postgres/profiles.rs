use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::rows::{
    DirectorRow, HeadmasterRow, NewDirectorRow, NewHeadmasterRow, NewOwnerRow, NewStudentRow,
    NewTeacherRow, OwnerRow, StudentRow, TeacherRow,
};
use super::{PgStore, db_error};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{
    Director, Headmaster, ListFilter, NewProfile, Owner, Profile, ProfileQuery, SortOrder,
    Student, Teacher,
};
use crate::repositories::ProfileRepository;

/// Boxed select over a profile table narrowed by a [`ProfileQuery`].
///
/// `list` and `count` both start from this statement, so a page and its total
/// always agree on the matching rows.
macro_rules! filtered {
    ($table:ident, $scope:ident, $query:expr) => {{
        use crate::schema::$table;

        let query: &ProfileQuery = $query;
        let mut statement = $table::table.into_boxed::<Pg>();
        if let Some(scope_id) = query.scope_id {
            statement = statement.filter($table::$scope.eq(scope_id));
        }
        if let Some(user_id) = query.user_id {
            statement = statement.filter($table::user_id.eq(user_id));
        }
        if let Some(created) = &query.created {
            if let Some(from) = created.from() {
                statement = statement.filter($table::created_at.ge(jiff_diesel::Timestamp::from(from)));
            }
            if let Some(till) = created.till() {
                statement = statement.filter($table::created_at.lt(jiff_diesel::Timestamp::from(till)));
            }
        }
        statement
    }};
}

macro_rules! pg_profile_repository {
    ($profile:ident, $table:ident, $scope:ident, $row:ident, $new_row:ident) => {
        #[async_trait]
        impl ProfileRepository<$profile> for PgStore {
            async fn create(
                &self,
                ctx: &Ctx,
                new_profile: NewProfile<<$profile as Profile>::New>,
            ) -> AppResult<$profile> {
                const OPERATION: &str = concat!("insert ", stringify!($table));
                ctx.run(OPERATION, async {
                    let row = $new_row::from(new_profile);
                    let mut conn = self.conn(ctx).await?;
                    diesel::insert_into(crate::schema::$table::table)
                        .values(&row)
                        .returning($row::as_returning())
                        .get_result::<$row>(conn.get()?)
                        .await
                        .map($profile::from)
                        .map_err(|e| db_error(e, OPERATION))
                })
                .await
            }

            async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<$profile>> {
                const OPERATION: &str = concat!("select ", stringify!($table), " by id");
                ctx.run(OPERATION, async {
                    let mut conn = self.conn(ctx).await?;
                    crate::schema::$table::table
                        .find(id)
                        .select($row::as_select())
                        .first::<$row>(conn.get()?)
                        .await
                        .optional()
                        .map(|row| row.map($profile::from))
                        .map_err(|e| db_error(e, OPERATION))
                })
                .await
            }

            async fn list(
                &self,
                ctx: &Ctx,
                query: &ProfileQuery,
                filter: &ListFilter,
            ) -> AppResult<Vec<$profile>> {
                use crate::schema::$table;

                const OPERATION: &str = concat!("list ", stringify!($table));
                ctx.run(OPERATION, async {
                    let statement = filtered!($table, $scope, query);
                    let statement = match filter.sort_order() {
                        SortOrder::Asc => {
                            statement.order(($table::created_at.asc(), $table::id.asc()))
                        }
                        SortOrder::Desc => {
                            statement.order(($table::created_at.desc(), $table::id.desc()))
                        }
                    };
                    let statement = match filter.pagination() {
                        Some(page) => statement.limit(page.limit()).offset(page.offset()),
                        None => statement,
                    };

                    let mut conn = self.conn(ctx).await?;
                    statement
                        .select($row::as_select())
                        .load::<$row>(conn.get()?)
                        .await
                        .map(|rows| rows.into_iter().map($profile::from).collect())
                        .map_err(|e| db_error(e, OPERATION))
                })
                .await
            }

            async fn count(&self, ctx: &Ctx, query: &ProfileQuery) -> AppResult<i64> {
                const OPERATION: &str = concat!("count ", stringify!($table));
                ctx.run(OPERATION, async {
                    let statement = filtered!($table, $scope, query);
                    let mut conn = self.conn(ctx).await?;
                    statement
                        .count()
                        .get_result::<i64>(conn.get()?)
                        .await
                        .map_err(|e| db_error(e, OPERATION))
                })
                .await
            }
        }
    };
}

pg_profile_repository!(Director, directors, school_id, DirectorRow, NewDirectorRow);
pg_profile_repository!(Headmaster, headmasters, school_id, HeadmasterRow, NewHeadmasterRow);
pg_profile_repository!(Teacher, teachers, school_id, TeacherRow, NewTeacherRow);
pg_profile_repository!(Student, students, school_id, StudentRow, NewStudentRow);
pg_profile_repository!(Owner, owners, organization_id, OwnerRow, NewOwnerRow);
