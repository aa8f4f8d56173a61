use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use super::{MemoryStore, duplicate, invalid_reference};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{GuardianQuery, ListFilter, NewGuardianLink, StudentGuardian};
use crate::repositories::GuardianRepository;

const ENTITY: &str = "student_guardians";

#[async_trait]
impl GuardianRepository for MemoryStore {
    async fn create(&self, ctx: &Ctx, link: NewGuardianLink) -> AppResult<StudentGuardian> {
        self.with_tables(ctx, "insert student_guardians", move |tables| {
            if !tables.user_roles.contains_key(&link.role_id) {
                return Err(invalid_reference(ENTITY, "role_id", link.role_id));
            }
            if !tables.users.contains_key(&link.user_id) {
                return Err(invalid_reference(ENTITY, "user_id", link.user_id));
            }
            if !tables.students.contains_key(&link.student_id) {
                return Err(invalid_reference(ENTITY, "student_id", link.student_id));
            }
            let taken = tables.guardians.values().any(|existing| {
                existing.user_id == link.user_id && existing.student_id == link.student_id
            });
            if taken {
                return Err(duplicate(
                    ENTITY,
                    "user_id, student_id",
                    format!("{}, {}", link.user_id, link.student_id),
                ));
            }

            let now = Timestamp::now();
            let guardian = StudentGuardian {
                id: Uuid::new_v4(),
                role_id: link.role_id,
                user_id: link.user_id,
                student_id: link.student_id,
                relation: link.relation,
                created_at: now,
                updated_at: now,
                user: None,
                student: None,
            };
            tables.guardians.insert(guardian.id, guardian.clone());
            Ok(guardian)
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<StudentGuardian>> {
        self.with_tables(ctx, "select student_guardians by id", move |tables| {
            Ok(tables.guardians.get(&id).cloned())
        })
        .await
    }

    async fn list(
        &self,
        ctx: &Ctx,
        query: &GuardianQuery,
        filter: &ListFilter,
    ) -> AppResult<Vec<StudentGuardian>> {
        self.with_tables(ctx, "list student_guardians", |tables| {
            let rows: Vec<StudentGuardian> = tables
                .guardians
                .values()
                .filter(|link| query.matches(link))
                .cloned()
                .collect();
            Ok(filter.apply(rows, |link| (link.created_at, link.id)))
        })
        .await
    }

    async fn count(&self, ctx: &Ctx, query: &GuardianQuery) -> AppResult<i64> {
        self.with_tables(ctx, "count student_guardians", |tables| {
            let matching = tables
                .guardians
                .values()
                .filter(|link| query.matches(link))
                .count();
            Ok(i64::try_from(matching).unwrap_or(i64::MAX))
        })
        .await
    }
}
