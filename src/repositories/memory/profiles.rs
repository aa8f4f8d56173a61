use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use super::{MemoryStore, Tables, duplicate, invalid_reference};
use crate::db::Ctx;
use crate::error::AppResult;
use crate::models::{
    Director, Headmaster, ListFilter, NewProfile, Owner, Profile, ProfileQuery, ScopeKind, Student,
    Teacher,
};
use crate::repositories::ProfileRepository;

/// Table access and row construction for a profile kept in [`Tables`].
pub(crate) trait MemoryProfile: Profile {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;

    fn materialize(id: Uuid, new_profile: NewProfile<Self::New>, at: Timestamp) -> Self;
}

macro_rules! school_profile {
    ($profile:ident, $table:ident) => {
        impl MemoryProfile for $profile {
            fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
                &tables.$table
            }

            fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
                &mut tables.$table
            }

            fn materialize(id: Uuid, new_profile: NewProfile<Self::New>, at: Timestamp) -> Self {
                let fields = new_profile.fields;
                Self {
                    id,
                    role_id: new_profile.role_id,
                    user_id: fields.user_id,
                    school_id: fields.school_id,
                    phone: fields.phone,
                    email: fields.email,
                    created_at: at,
                    updated_at: at,
                    user: None,
                    school: None,
                }
            }
        }
    };
}

school_profile!(Director, directors);
school_profile!(Headmaster, headmasters);
school_profile!(Teacher, teachers);

impl MemoryProfile for Student {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.students
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.students
    }

    fn materialize(id: Uuid, new_profile: NewProfile<Self::New>, at: Timestamp) -> Self {
        let fields = new_profile.fields;
        Self {
            id,
            role_id: new_profile.role_id,
            user_id: fields.user_id,
            school_id: fields.school_id,
            group_id: fields.group_id,
            phone: fields.phone,
            email: fields.email,
            created_at: at,
            updated_at: at,
            user: None,
            school: None,
            group: None,
        }
    }
}

impl MemoryProfile for Owner {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.owners
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.owners
    }

    fn materialize(id: Uuid, new_profile: NewProfile<Self::New>, at: Timestamp) -> Self {
        let fields = new_profile.fields;
        Self {
            id,
            role_id: new_profile.role_id,
            user_id: fields.user_id,
            organization_id: fields.organization_id,
            phone: fields.phone,
            email: fields.email,
            created_at: at,
            updated_at: at,
            user: None,
            organization: None,
        }
    }
}

/// Mirrors the foreign keys and unique constraints of a profile table.
fn check_constraints<P: MemoryProfile>(tables: &Tables, profile: &P) -> AppResult<()> {
    if !tables.user_roles.contains_key(&profile.role_id()) {
        return Err(invalid_reference(P::ENTITY, "role_id", profile.role_id()));
    }
    if !tables.users.contains_key(&profile.user_id()) {
        return Err(invalid_reference(P::ENTITY, "user_id", profile.user_id()));
    }
    let scope_known = match P::ROLE.scope_kind() {
        ScopeKind::School => tables.schools.contains_key(&profile.scope_id()),
        ScopeKind::Organization => {
            tables.organizations.contains_key(&profile.scope_id())
        }
    };
    if !scope_known {
        return Err(invalid_reference(P::ENTITY, "scope_id", profile.scope_id()));
    }

    for existing in P::table(tables).values() {
        if let Some(phone) = profile.phone().filter(|phone| existing.phone() == Some(*phone)) {
            return Err(duplicate(P::ENTITY, "phone", phone));
        }
        if let Some(email) = profile.email().filter(|email| existing.email() == Some(*email)) {
            return Err(duplicate(P::ENTITY, "email", email));
        }
    }
    Ok(())
}

#[async_trait]
impl<P: MemoryProfile> ProfileRepository<P> for MemoryStore {
    async fn create(&self, ctx: &Ctx, new_profile: NewProfile<P::New>) -> AppResult<P> {
        self.with_tables(ctx, P::ENTITY, move |tables| {
            let profile = P::materialize(Uuid::new_v4(), new_profile, Timestamp::now());
            check_constraints(tables, &profile)?;
            P::table_mut(tables).insert(profile.id(), profile.clone());
            Ok(profile)
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<P>> {
        self.with_tables(ctx, P::ENTITY, move |tables| {
            Ok(P::table(tables).get(&id).cloned())
        })
        .await
    }

    async fn list(
        &self,
        ctx: &Ctx,
        query: &ProfileQuery,
        filter: &ListFilter,
    ) -> AppResult<Vec<P>> {
        self.with_tables(ctx, P::ENTITY, |tables| {
            let rows: Vec<P> = P::table(tables)
                .values()
                .filter(|profile| query.matches(*profile))
                .cloned()
                .collect();
            Ok(filter.apply(rows, |profile| (profile.created_at(), profile.id())))
        })
        .await
    }

    async fn count(&self, ctx: &Ctx, query: &ProfileQuery) -> AppResult<i64> {
        self.with_tables(ctx, P::ENTITY, |tables| {
            let matching = P::table(tables)
                .values()
                .filter(|profile| query.matches(*profile))
                .count();
            Ok(i64::try_from(matching).unwrap_or(i64::MAX))
        })
        .await
    }
}
