//! Pure read-time joins between aggregates.
//!
//! A value lists the foreign keys it needs through [`Hydrate::collect_keys`];
//! once the related rows are fetched into a [`Related`] index, the value is
//! rebuilt with its relation fields filled. Keys without a matching row leave
//! the field `None`.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::models::{
    EduOrganizationShortInfo, Grade, GroupShortInfo, SchoolShortInfo, StudentShortInfo,
    TeacherShortInfo, User,
};

/// Deduplicated foreign keys per related aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationKeys {
    pub users: BTreeSet<Uuid>,
    pub schools: BTreeSet<Uuid>,
    pub organizations: BTreeSet<Uuid>,
    pub groups: BTreeSet<Uuid>,
    pub grades: BTreeSet<Uuid>,
    pub teachers: BTreeSet<Uuid>,
    pub students: BTreeSet<Uuid>,
}

impl RelationKeys {
    pub fn of<'a, T: Hydrate + 'a>(items: impl IntoIterator<Item = &'a T>) -> Self {
        let mut keys = Self::default();
        for item in items {
            item.collect_keys(&mut keys);
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.schools.is_empty()
            && self.organizations.is_empty()
            && self.groups.is_empty()
            && self.grades.is_empty()
            && self.teachers.is_empty()
            && self.students.is_empty()
    }
}

/// Related rows indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Related {
    pub users: HashMap<Uuid, User>,
    pub schools: HashMap<Uuid, SchoolShortInfo>,
    pub organizations: HashMap<Uuid, EduOrganizationShortInfo>,
    pub groups: HashMap<Uuid, GroupShortInfo>,
    pub grades: HashMap<Uuid, Grade>,
    pub teachers: HashMap<Uuid, TeacherShortInfo>,
    pub students: HashMap<Uuid, StudentShortInfo>,
}

impl Related {
    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).cloned()
    }

    pub fn school(&self, id: Uuid) -> Option<SchoolShortInfo> {
        self.schools.get(&id).cloned()
    }

    pub fn organization(&self, id: Uuid) -> Option<EduOrganizationShortInfo> {
        self.organizations.get(&id).cloned()
    }

    pub fn group(&self, id: Uuid) -> Option<GroupShortInfo> {
        self.groups.get(&id).cloned()
    }

    pub fn grade(&self, id: Uuid) -> Option<Grade> {
        self.grades.get(&id).cloned()
    }

    pub fn teacher(&self, id: Uuid) -> Option<TeacherShortInfo> {
        self.teachers.get(&id).cloned()
    }

    pub fn student(&self, id: Uuid) -> Option<StudentShortInfo> {
        self.students.get(&id).cloned()
    }
}

/// A value whose relation fields are filled from a [`Related`] index.
pub trait Hydrate: Sized {
    fn collect_keys(&self, keys: &mut RelationKeys);

    fn hydrate(self, related: &Related) -> Self;
}

pub fn hydrate_all<T: Hydrate>(items: Vec<T>, related: &Related) -> Vec<T> {
    items.into_iter().map(|item| item.hydrate(related)).collect()
}

/// Indexes rows by their id.
pub fn index_by_id<T>(rows: Vec<T>, id: impl Fn(&T) -> Uuid) -> HashMap<Uuid, T> {
    rows.into_iter().map(|row| (id(&row), row)).collect()
}
