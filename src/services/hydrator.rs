//! Fills the relation fields of read models.
//!
//! Keys are collected from the values through [`Hydrate`], fetched once per
//! related aggregate and joined in memory. Schools pull in their organization
//! and groups pull in their grade and class teacher, so the cascaded keys are
//! merged into the organization, grade and teacher fetches.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{
    Hydrate, Related, RelationKeys, SchoolShortInfo, User, hydrate_all, index_by_id,
};
use crate::repositories::{CatalogRepository, RosterRepository, UserRepository};

/// How relations of a single aggregate type are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// One value: a lone key is resolved with a by-id lookup.
    Single,
    /// A page: every non-empty key set is resolved with one batch call.
    Batch,
}

#[derive(Clone)]
pub struct Hydrator {
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
    roster: Arc<dyn RosterRepository>,
}

impl Hydrator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        catalog: Arc<dyn CatalogRepository>,
        roster: Arc<dyn RosterRepository>,
    ) -> Self {
        Self {
            users,
            catalog,
            roster,
        }
    }

    /// Hydrates one value.
    pub async fn one<T: Hydrate>(&self, ctx: &Ctx, item: T) -> AppResult<T> {
        let keys = RelationKeys::of([&item]);
        let related = self.resolve(ctx, keys, FetchMode::Single).await?;
        Ok(item.hydrate(&related))
    }

    /// Hydrates a page of values with one fetch per related aggregate.
    pub async fn many<T: Hydrate>(&self, ctx: &Ctx, items: Vec<T>) -> AppResult<Vec<T>> {
        if items.is_empty() {
            return Ok(items);
        }
        let keys = RelationKeys::of(&items);
        let related = self.resolve(ctx, keys, FetchMode::Batch).await?;
        Ok(hydrate_all(items, &related))
    }

    async fn resolve(&self, ctx: &Ctx, mut keys: RelationKeys, mode: FetchMode) -> AppResult<Related> {
        let mut related = Related {
            schools: self.schools(ctx, &keys.schools, mode).await?,
            ..Related::default()
        };
        if !keys.groups.is_empty() {
            let groups = self.catalog.groups_by_ids(ctx, &ids(&keys.groups)).await?;
            related.groups = index_by_id(groups, |group| group.id);
        }

        for school in related.schools.values() {
            school.collect_keys(&mut keys);
        }
        for group in related.groups.values() {
            group.collect_keys(&mut keys);
        }

        if !keys.organizations.is_empty() {
            let organizations = self
                .catalog
                .organizations_short_by_ids(ctx, &ids(&keys.organizations))
                .await?;
            related.organizations = index_by_id(organizations, |organization| organization.id);
        }
        if !keys.grades.is_empty() {
            let grades = self.catalog.grades_by_ids(ctx, &ids(&keys.grades)).await?;
            related.grades = index_by_id(grades, |grade| grade.id);
        }
        if !keys.teachers.is_empty() {
            let teachers = self.roster.teachers_by_ids(ctx, &ids(&keys.teachers)).await?;
            related.teachers = index_by_id(teachers, |teacher| teacher.id);
        }
        if !keys.students.is_empty() {
            let students = self.roster.students_by_ids(ctx, &ids(&keys.students)).await?;
            related.students = index_by_id(students, |student| student.id);
        }
        related.users = self.users(ctx, &keys.users, mode).await?;

        related.schools = hydrate_map(std::mem::take(&mut related.schools), &related);
        related.groups = hydrate_map(std::mem::take(&mut related.groups), &related);

        debug!(
            users = related.users.len(),
            schools = related.schools.len(),
            organizations = related.organizations.len(),
            groups = related.groups.len(),
            students = related.students.len(),
            "Resolved relations"
        );
        Ok(related)
    }

    async fn users(
        &self,
        ctx: &Ctx,
        keys: &BTreeSet<Uuid>,
        mode: FetchMode,
    ) -> AppResult<HashMap<Uuid, User>> {
        let rows = match (mode, sole(keys)) {
            (_, None) if keys.is_empty() => Vec::new(),
            (FetchMode::Single, Some(id)) => {
                self.users.find_by_id(ctx, id).await?.into_iter().collect()
            }
            _ => self.users.find_by_ids(ctx, &ids(keys)).await?,
        };
        Ok(index_by_id(rows, |user| user.id))
    }

    async fn schools(
        &self,
        ctx: &Ctx,
        keys: &BTreeSet<Uuid>,
        mode: FetchMode,
    ) -> AppResult<HashMap<Uuid, SchoolShortInfo>> {
        let rows = match (mode, sole(keys)) {
            (_, None) if keys.is_empty() => Vec::new(),
            (FetchMode::Single, Some(id)) => self
                .catalog
                .school_short_by_id(ctx, id)
                .await?
                .into_iter()
                .collect(),
            _ => self.catalog.schools_short_by_ids(ctx, &ids(keys)).await?,
        };
        Ok(index_by_id(rows, |school| school.id))
    }
}

fn ids(keys: &BTreeSet<Uuid>) -> Vec<Uuid> {
    keys.iter().copied().collect()
}

fn sole(keys: &BTreeSet<Uuid>) -> Option<Uuid> {
    if keys.len() == 1 {
        keys.first().copied()
    } else {
        None
    }
}

fn hydrate_map<T: Hydrate>(rows: HashMap<Uuid, T>, related: &Related) -> HashMap<Uuid, T> {
    rows.into_iter()
        .map(|(id, row)| (id, row.hydrate(related)))
        .collect()
}
