use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use uuid::Uuid;

use super::*;
use crate::db::{Ctx, TxHandle, UnitOfWork, UnitOfWorkCoordinator};
use crate::error::{AppError, AppResult, ErrorKind, TxStage};
use crate::models::{
    DateFilter, Director, EduOrganization, EduOrganizationShortInfo, Gender, Grade, Group,
    GroupShortInfo, GuardianQuery, GuardianRelation, Headmaster, ListFilter, NewDirector,
    NewEduOrganization, NewGrade, NewGroup, NewHeadmaster, NewOwner, NewProfile, NewSchool,
    NewStudent, NewStudentGuardian, NewTeacher, NewUser, NewUserRole, Owner, Pagination, Profile,
    ProfileQuery, Role, RoleScope, School, SchoolShortInfo, SortOrder, Student, Teacher, User,
};
use crate::repositories::{
    CatalogRepository, MemoryStore, ProfileRepository, Repositories, UserRepository,
    UserRoleRepository,
};

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    repos: Repositories,
    services: Services,
}

impl Harness {
    fn new() -> Self {
        Self::with(Repositories::in_memory(MemoryStore::new()))
    }

    fn with(repos: Repositories) -> Self {
        Self {
            services: Services::new(repos.clone()),
            repos,
        }
    }
}

struct World {
    organization: EduOrganization,
    school: School,
    grade: Grade,
    group: Group,
}

async fn world(services: &Services) -> World {
    let ctx = Ctx::background();
    let organization = services
        .catalog
        .add_organization(
            &ctx,
            NewEduOrganization {
                name: "Maorif".to_string(),
            },
        )
        .await
        .unwrap();
    let school = services
        .catalog
        .add_school(
            &ctx,
            NewSchool {
                organization_id: organization.id,
                name: "School No. 1".to_string(),
            },
        )
        .await
        .unwrap();
    let grade = services
        .catalog
        .add_grade(
            &ctx,
            NewGrade {
                school_id: school.id,
                level: 5,
                name: "5th grade".to_string(),
            },
        )
        .await
        .unwrap();
    let group = services
        .catalog
        .add_group(
            &ctx,
            NewGroup {
                school_id: school.id,
                grade_id: grade.id,
                class_teacher_id: None,
                name: "5A".to_string(),
            },
        )
        .await
        .unwrap();
    World {
        organization,
        school,
        grade,
        group,
    }
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        first_name: "Aziz".to_string(),
        last_name: "Karimov".to_string(),
        middle_name: None,
        gender: Gender::Male,
        phone: None,
        email: email.to_string(),
        password_hash: "hash".to_string(),
    }
}

async fn add_user(services: &Services, email: &str) -> User {
    services
        .identity
        .add_user(&Ctx::background(), new_user(email))
        .await
        .unwrap()
}

fn all_rows() -> ListFilter {
    ListFilter::unpaginated(SortOrder::Asc)
}

/// Per-type construction used by the tests that run for every profile.
trait Fixture: Profile {
    fn fields(user_id: Uuid, world: &World, phone: Option<&str>) -> Self::New;

    fn scope_of(world: &World) -> Uuid;

    fn user_of(&self) -> Option<&User>;

    fn service(services: &Services) -> &ProfileService<Self>;
}

macro_rules! school_fixture {
    ($profile:ident, $new:ident, $field:ident) => {
        impl Fixture for $profile {
            fn fields(user_id: Uuid, world: &World, phone: Option<&str>) -> $new {
                $new {
                    user_id,
                    school_id: world.school.id,
                    phone: phone.map(str::to_string),
                    email: None,
                }
            }

            fn scope_of(world: &World) -> Uuid {
                world.school.id
            }

            fn user_of(&self) -> Option<&User> {
                self.user.as_ref()
            }

            fn service(services: &Services) -> &ProfileService<Self> {
                &services.$field
            }
        }
    };
}

school_fixture!(Director, NewDirector, directors);
school_fixture!(Headmaster, NewHeadmaster, headmasters);
school_fixture!(Teacher, NewTeacher, teachers);

impl Fixture for Student {
    fn fields(user_id: Uuid, world: &World, phone: Option<&str>) -> NewStudent {
        NewStudent {
            user_id,
            school_id: world.school.id,
            group_id: Some(world.group.id),
            phone: phone.map(str::to_string),
            email: None,
        }
    }

    fn scope_of(world: &World) -> Uuid {
        world.school.id
    }

    fn user_of(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn service(services: &Services) -> &ProfileService<Self> {
        &services.students
    }
}

impl Fixture for Owner {
    fn fields(user_id: Uuid, world: &World, phone: Option<&str>) -> NewOwner {
        NewOwner {
            user_id,
            organization_id: world.organization.id,
            phone: phone.map(str::to_string),
            email: None,
        }
    }

    fn scope_of(world: &World) -> Uuid {
        world.organization.id
    }

    fn user_of(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn service(services: &Services) -> &ProfileService<Self> {
        &services.owners
    }
}

// ============================================================================
// Test doubles
// ============================================================================

struct CountingUsers {
    inner: Arc<dyn UserRepository>,
    single: AtomicUsize,
    batch: AtomicUsize,
}

impl CountingUsers {
    fn wrap(inner: Arc<dyn UserRepository>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            single: AtomicUsize::new(0),
            batch: AtomicUsize::new(0),
        })
    }

    /// (single lookups, batch lookups) since the last call.
    fn take(&self) -> (usize, usize) {
        (self.single.swap(0, Ordering::SeqCst), self.batch.swap(0, Ordering::SeqCst))
    }
}

#[async_trait]
impl UserRepository for CountingUsers {
    async fn create(&self, ctx: &Ctx, new_user: NewUser) -> AppResult<User> {
        self.inner.create(ctx, new_user).await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<User>> {
        self.single.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(ctx, id).await
    }

    async fn find_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<User>> {
        self.batch.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_ids(ctx, ids).await
    }

    async fn find_by_email(&self, ctx: &Ctx, email: &str) -> AppResult<Option<User>> {
        self.inner.find_by_email(ctx, email).await
    }
}

struct CountingCatalog {
    inner: Arc<dyn CatalogRepository>,
    school_single: AtomicUsize,
    school_batch: AtomicUsize,
    organization_batch: AtomicUsize,
}

impl CountingCatalog {
    fn wrap(inner: Arc<dyn CatalogRepository>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            school_single: AtomicUsize::new(0),
            school_batch: AtomicUsize::new(0),
            organization_batch: AtomicUsize::new(0),
        })
    }

    /// (single school lookups, batch school lookups, organization lookups)
    /// since the last call.
    fn take(&self) -> (usize, usize, usize) {
        (
            self.school_single.swap(0, Ordering::SeqCst),
            self.school_batch.swap(0, Ordering::SeqCst),
            self.organization_batch.swap(0, Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl CatalogRepository for CountingCatalog {
    async fn create_organization(
        &self,
        ctx: &Ctx,
        new_organization: NewEduOrganization,
    ) -> AppResult<EduOrganization> {
        self.inner.create_organization(ctx, new_organization).await
    }

    async fn create_school(&self, ctx: &Ctx, new_school: NewSchool) -> AppResult<School> {
        self.inner.create_school(ctx, new_school).await
    }

    async fn create_grade(&self, ctx: &Ctx, new_grade: NewGrade) -> AppResult<Grade> {
        self.inner.create_grade(ctx, new_grade).await
    }

    async fn create_group(&self, ctx: &Ctx, new_group: NewGroup) -> AppResult<Group> {
        self.inner.create_group(ctx, new_group).await
    }

    async fn organizations_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<EduOrganizationShortInfo>> {
        self.organization_batch.fetch_add(1, Ordering::SeqCst);
        self.inner.organizations_short_by_ids(ctx, ids).await
    }

    async fn school_short_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<SchoolShortInfo>> {
        self.school_single.fetch_add(1, Ordering::SeqCst);
        self.inner.school_short_by_id(ctx, id).await
    }

    async fn schools_short_by_ids(
        &self,
        ctx: &Ctx,
        ids: &[Uuid],
    ) -> AppResult<Vec<SchoolShortInfo>> {
        self.school_batch.fetch_add(1, Ordering::SeqCst);
        self.inner.schools_short_by_ids(ctx, ids).await
    }

    async fn grades_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<Grade>> {
        self.inner.grades_by_ids(ctx, ids).await
    }

    async fn groups_by_ids(&self, ctx: &Ctx, ids: &[Uuid]) -> AppResult<Vec<GroupShortInfo>> {
        self.inner.groups_by_ids(ctx, ids).await
    }
}

/// Delays director inserts under the caller's deadline.
struct SlowDirectors {
    inner: Arc<dyn ProfileRepository<Director>>,
    delay: Duration,
}

#[async_trait]
impl ProfileRepository<Director> for SlowDirectors {
    async fn create(&self, ctx: &Ctx, new_profile: NewProfile<NewDirector>) -> AppResult<Director> {
        ctx.run("slow insert directors", async {
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
        .await?;
        self.inner.create(ctx, new_profile).await
    }

    async fn find_by_id(&self, ctx: &Ctx, id: Uuid) -> AppResult<Option<Director>> {
        self.inner.find_by_id(ctx, id).await
    }

    async fn list(
        &self,
        ctx: &Ctx,
        query: &ProfileQuery,
        filter: &ListFilter,
    ) -> AppResult<Vec<Director>> {
        self.inner.list(ctx, query, filter).await
    }

    async fn count(&self, ctx: &Ctx, query: &ProfileQuery) -> AppResult<i64> {
        self.inner.count(ctx, query).await
    }
}

/// Refuses every commit after rolling the work back.
struct RefusingCommit {
    inner: Arc<dyn UnitOfWork>,
}

#[async_trait]
impl UnitOfWork for RefusingCommit {
    async fn begin(&self, ctx: &Ctx) -> AppResult<TxHandle> {
        self.inner.begin(ctx).await
    }

    async fn commit(&self, tx: &TxHandle) -> AppResult<()> {
        self.inner.rollback(tx).await?;
        Err(AppError::internal("serialization failure"))
    }

    async fn rollback(&self, tx: &TxHandle) -> AppResult<()> {
        self.inner.rollback(tx).await
    }
}

// ============================================================================
// Provisioning
// ============================================================================

async fn assert_failed_profile_leaves_no_role<P: Fixture>() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let first = add_user(&h.services, "first@x.com").await;
    let second = add_user(&h.services, "second@x.com").await;
    let service = P::service(&h.services);

    service
        .add(&ctx, P::fields(first.id, &world, Some("+992900000001")))
        .await
        .unwrap();

    // The role row is written before the profile insert hits the phone index.
    let error = service
        .add(&ctx, P::fields(second.id, &world, Some("+992900000001")))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert!(matches!(error.root(), AppError::Duplicate { field, .. } if field == "phone"));

    let roles = h.services.identity.roles_of_user(&ctx, second.id).await.unwrap();
    assert!(roles.is_empty(), "{} left a role row behind", P::ENTITY);

    let (rows, total) = service
        .list(&ctx, &ProfileQuery::default().for_user(second.id), &all_rows())
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_failed_director_leaves_no_role() {
    assert_failed_profile_leaves_no_role::<Director>().await;
}

#[tokio::test]
async fn test_failed_headmaster_leaves_no_role() {
    assert_failed_profile_leaves_no_role::<Headmaster>().await;
}

#[tokio::test]
async fn test_failed_teacher_leaves_no_role() {
    assert_failed_profile_leaves_no_role::<Teacher>().await;
}

#[tokio::test]
async fn test_failed_student_leaves_no_role() {
    assert_failed_profile_leaves_no_role::<Student>().await;
}

#[tokio::test]
async fn test_failed_owner_leaves_no_role() {
    assert_failed_profile_leaves_no_role::<Owner>().await;
}

async fn assert_added_profile_reads_back<P: Fixture>() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "user@x.com").await;
    let service = P::service(&h.services);

    let created = service
        .add(&ctx, P::fields(user.id, &world, None))
        .await
        .unwrap();
    assert_eq!(created.user_id(), user.id);
    assert_eq!(created.scope_id(), P::scope_of(&world));
    assert_eq!(created.user_of(), Some(&user));

    let fetched = service.by_id(&ctx, created.id()).await.unwrap();
    assert_eq!(fetched, created);

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].id, created.role_id());
    assert_eq!(roles[0].role, P::ROLE);
    assert_eq!(roles[0].scope().key(), Some(P::scope_of(&world)));
}

#[tokio::test]
async fn test_director_reads_back() {
    assert_added_profile_reads_back::<Director>().await;
}

#[tokio::test]
async fn test_headmaster_reads_back() {
    assert_added_profile_reads_back::<Headmaster>().await;
}

#[tokio::test]
async fn test_teacher_reads_back() {
    assert_added_profile_reads_back::<Teacher>().await;
}

#[tokio::test]
async fn test_student_reads_back() {
    assert_added_profile_reads_back::<Student>().await;
}

#[tokio::test]
async fn test_owner_reads_back() {
    assert_added_profile_reads_back::<Owner>().await;
}

#[tokio::test]
async fn test_add_director_hydrates_user_and_school() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;

    let director = h
        .services
        .directors
        .add(
            &ctx,
            NewDirector {
                user_id: user.id,
                school_id: world.school.id,
                phone: Some("+992900000001".to_string()),
                email: Some("d1@x.com".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(director.phone.as_deref(), Some("+992900000001"));
    assert_eq!(director.email.as_deref(), Some("d1@x.com"));
    assert_eq!(director.user, Some(user.clone()));

    let school = director.school.clone().unwrap();
    assert_eq!(school.id, world.school.id);
    assert_eq!(school.name, "School No. 1");
    assert_eq!(
        school.organization.map(|organization| organization.id),
        Some(world.organization.id)
    );

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role, Role::Director);
    assert_eq!(roles[0].id, director.role_id);
    assert_eq!(roles[0].school_id, Some(world.school.id));
    assert_eq!(
        roles[0].school.as_ref().map(|school| school.id),
        Some(world.school.id)
    );
}

#[tokio::test]
async fn test_second_director_in_same_school_is_rejected() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;

    let first = h
        .services
        .directors
        .add(&ctx, Director::fields(user.id, &world, Some("+992900000001")))
        .await
        .unwrap();

    let error = h
        .services
        .directors
        .add(&ctx, Director::fields(user.id, &world, None))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);
    match error.root() {
        AppError::RoleAlreadyAssigned {
            user_id,
            role,
            scope_id,
        } => {
            assert_eq!(*user_id, user.id);
            assert_eq!(*role, Role::Director);
            assert_eq!(*scope_id, Some(world.school.id));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let (rows, total) = h
        .services
        .directors
        .list(&ctx, &ProfileQuery::in_scope(world.school.id), &all_rows())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows, vec![first.clone()]);
    assert_eq!(h.services.directors.by_id(&ctx, first.id).await.unwrap(), first);
}

#[tokio::test]
async fn test_concurrent_directors_for_same_scope_admit_one() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;
    let fields = Director::fields(user.id, &world, None);

    let (left, right) = tokio::join!(
        h.services.directors.add(&ctx, fields.clone()),
        h.services.directors.add(&ctx, fields),
    );

    let outcomes = [left, right];
    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(admitted, 1);
    let rejected = outcomes.iter().find_map(|outcome| outcome.as_ref().err()).unwrap();
    assert_eq!(rejected.kind(), ErrorKind::Conflict);

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert_eq!(roles.len(), 1);
}

#[tokio::test]
async fn test_same_user_may_direct_two_schools() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let other_school = h
        .services
        .catalog
        .add_school(
            &ctx,
            NewSchool {
                organization_id: world.organization.id,
                name: "School No. 2".to_string(),
            },
        )
        .await
        .unwrap();
    let user = add_user(&h.services, "aziz@x.com").await;

    h.services
        .directors
        .add(&ctx, Director::fields(user.id, &world, None))
        .await
        .unwrap();
    let second = h
        .services
        .directors
        .add(
            &ctx,
            NewDirector {
                school_id: other_school.id,
                ..Director::fields(user.id, &world, None)
            },
        )
        .await
        .unwrap();

    assert_eq!(second.school_id, other_school.id);
    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert_eq!(roles.len(), 2);
}

#[tokio::test]
async fn test_invalid_phone_is_rejected_before_any_write() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;

    let error = h
        .services
        .teachers
        .add(&ctx, Teacher::fields(user.id, &world, Some("900000001")))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadRequest);
    assert!(matches!(error, AppError::Validation { ref field, .. } if field == "phone"));

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert!(roles.is_empty());
}

#[tokio::test]
async fn test_unknown_user_is_rejected() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;

    let error = h
        .services
        .directors
        .add(&ctx, Director::fields(Uuid::new_v4(), &world, None))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_missing_profile_is_not_found() {
    let h = Harness::new();
    let error = h
        .services
        .owners
        .by_id(&Ctx::background(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_add_inside_open_unit_of_work_is_rejected() {
    let h = Harness::new();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;
    let coordinator = UnitOfWorkCoordinator::new(h.repos.unit_of_work.clone());

    let (tx_ctx, tx) = coordinator.begin(&Ctx::background()).await.unwrap();
    let error = h
        .services
        .directors
        .add(&tx_ctx, Director::fields(user.id, &world, None))
        .await
        .unwrap_err();
    assert!(matches!(error, AppError::NestedUnitOfWork { .. }));
    assert_eq!(error.kind(), ErrorKind::Internal);

    coordinator.end(tx, Ok(())).await.unwrap();
}

#[tokio::test]
async fn test_provision_in_shares_the_callers_unit_of_work() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;
    let coordinator = UnitOfWorkCoordinator::new(h.repos.unit_of_work.clone());

    let (tx_ctx, tx) = coordinator.begin(&ctx).await.unwrap();
    let abandoned_teacher = h
        .services
        .teachers
        .workflow()
        .provision_in(&tx_ctx, Teacher::fields(user.id, &world, None))
        .await
        .unwrap();
    h.services
        .headmasters
        .workflow()
        .provision_in(&tx_ctx, Headmaster::fields(user.id, &world, None))
        .await
        .unwrap();
    let abandoned: AppResult<()> = Err(AppError::bad_request("abandoned"));
    coordinator.end(tx, abandoned).await.unwrap_err();

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert!(roles.is_empty());
    let rolled_back = h
        .repos
        .user_roles
        .find_by_id(&ctx, abandoned_teacher.role_id())
        .await
        .unwrap();
    assert!(rolled_back.is_none());

    let (tx_ctx, tx) = coordinator.begin(&ctx).await.unwrap();
    let teacher = h
        .services
        .teachers
        .workflow()
        .provision_in(&tx_ctx, Teacher::fields(user.id, &world, None))
        .await;
    let teacher = coordinator.end(tx, teacher).await.unwrap();

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role, Role::Teacher);
    let committed = h
        .repos
        .user_roles
        .find_by_id(&ctx, teacher.role_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(committed.user_id, user.id);
    assert_eq!(committed.school_id, Some(world.school.id));
}

#[tokio::test]
async fn test_elapsed_deadline_rolls_back_role() {
    let store = MemoryStore::new();
    let mut repos = Repositories::in_memory(store);
    repos.directors = Arc::new(SlowDirectors {
        inner: repos.directors.clone(),
        delay: Duration::from_millis(500),
    });
    let h = Harness::with(repos);
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;

    let ctx = Ctx::background().with_timeout(Duration::from_millis(50));
    let error = h
        .services
        .directors
        .add(&ctx, Director::fields(user.id, &world, None))
        .await
        .unwrap_err();
    assert!(matches!(error.root(), AppError::DeadlineExceeded { .. }));
    assert_eq!(error.kind(), ErrorKind::Internal);

    let roles = h
        .services
        .identity
        .roles_of_user(&Ctx::background(), user.id)
        .await
        .unwrap();
    assert!(roles.is_empty());
}

#[tokio::test]
async fn test_refused_commit_is_reported_and_nothing_persists() {
    let mut repos = Repositories::in_memory(MemoryStore::new());
    repos.unit_of_work = Arc::new(RefusingCommit {
        inner: repos.unit_of_work.clone(),
    });
    let h = Harness::with(repos);
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;

    let error = h
        .services
        .owners
        .add(&ctx, Owner::fields(user.id, &world, None))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AppError::UnitOfWork {
            stage: TxStage::Commit,
            ..
        }
    ));
    assert_eq!(error.kind(), ErrorKind::Internal);

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();
    assert!(roles.is_empty());
}

// ============================================================================
// Guardians
// ============================================================================

async fn enrol(h: &Harness, world: &World, email: &str) -> Student {
    let user = add_user(&h.services, email).await;
    h.services
        .students
        .add(&Ctx::background(), Student::fields(user.id, world, None))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_guardian_of_two_students_in_one_school() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let first = enrol(&h, &world, "first@x.com").await;
    let second = enrol(&h, &world, "second@x.com").await;
    let parent = add_user(&h.services, "parent@x.com").await;

    for student in [&first, &second] {
        let link = h
            .services
            .guardians
            .assign_student_guardian(
                &ctx,
                NewStudentGuardian {
                    user_id: parent.id,
                    student_id: student.id,
                    relation: GuardianRelation::Mother,
                },
            )
            .await
            .unwrap();
        assert_eq!(link.user, Some(parent.clone()));
        assert_eq!(link.student.as_ref().map(|s| s.id), Some(student.id));
    }

    let roles = h.services.identity.roles_of_user(&ctx, parent.id).await.unwrap();
    assert_eq!(roles.len(), 2);
    assert!(roles.iter().all(|role| role.role == Role::Guardian));
    assert!(roles.iter().all(|role| role.school_id == Some(world.school.id)));

    let (links, total) = h
        .services
        .guardians
        .list(&ctx, &GuardianQuery::of_student(first.id), &all_rows())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(links[0].user_id, parent.id);
}

#[tokio::test]
async fn test_repeated_guardian_link_rolls_back_its_role() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let student = enrol(&h, &world, "kid@x.com").await;
    let parent = add_user(&h.services, "parent@x.com").await;
    let link = NewStudentGuardian {
        user_id: parent.id,
        student_id: student.id,
        relation: GuardianRelation::Father,
    };

    h.services
        .guardians
        .assign_student_guardian(&ctx, link.clone())
        .await
        .unwrap();
    let error = h
        .services
        .guardians
        .assign_student_guardian(&ctx, link)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);

    let roles = h.services.identity.roles_of_user(&ctx, parent.id).await.unwrap();
    assert_eq!(roles.len(), 1);
}

#[tokio::test]
async fn test_guardian_of_unknown_student_is_not_found() {
    let h = Harness::new();
    let parent = add_user(&h.services, "parent@x.com").await;

    let error = h
        .services
        .guardians
        .assign_student_guardian(
            &Ctx::background(),
            NewStudentGuardian {
                user_id: parent.id,
                student_id: Uuid::new_v4(),
                relation: GuardianRelation::Aunt,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Listing and hydration
// ============================================================================

#[tokio::test]
async fn test_pages_are_disjoint_and_sum_to_total() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    for i in 0..25 {
        let user = add_user(&h.services, &format!("user{i}@x.com")).await;
        h.services
            .directors
            .add(&ctx, Director::fields(user.id, &world, None))
            .await
            .unwrap();
    }
    let query = ProfileQuery::in_scope(world.school.id);

    for order in [SortOrder::Asc, SortOrder::Desc] {
        let mut seen = HashSet::new();
        let mut sizes = Vec::new();
        for page in 1..=3 {
            let filter = ListFilter::new(order, Pagination::new(page, 10).unwrap());
            let (rows, total) = h.services.directors.list(&ctx, &query, &filter).await.unwrap();
            assert_eq!(total, 25);
            sizes.push(rows.len());
            for row in rows {
                assert!(seen.insert(row.id), "row {} appeared twice", row.id);
            }
        }
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(seen.len(), 25);
    }

    let (ascending, _) = h
        .services
        .directors
        .list(&ctx, &query, &ListFilter::unpaginated(SortOrder::Asc))
        .await
        .unwrap();
    let (mut descending, _) = h
        .services
        .directors
        .list(&ctx, &query, &ListFilter::unpaginated(SortOrder::Desc))
        .await
        .unwrap();
    descending.reverse();
    assert_eq!(ascending, descending);
}

#[tokio::test]
async fn test_created_window_narrows_list_and_count() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;
    h.services
        .teachers
        .add(&ctx, Teacher::fields(user.id, &world, None))
        .await
        .unwrap();

    let now = Timestamp::now();
    let day = SignedDuration::from_hours(24);
    let around = DateFilter::new(
        Some(now.checked_sub(day).unwrap()),
        Some(now.checked_add(day).unwrap()),
    )
    .unwrap();
    let later =
        DateFilter::new(Some(now.checked_add(SignedDuration::from_hours(48)).unwrap()), None)
            .unwrap();

    let (rows, total) = h
        .services
        .teachers
        .list(&ctx, &ProfileQuery::default().created_within(around), &all_rows())
        .await
        .unwrap();
    assert_eq!((rows.len(), total), (1, 1));

    let (rows, total) = h
        .services
        .teachers
        .list(&ctx, &ProfileQuery::default().created_within(later), &all_rows())
        .await
        .unwrap();
    assert_eq!((rows.len(), total), (0, 0));
}

/// Inserts `n` directors spread over three schools without units of work.
async fn seed_directors(repos: &Repositories, world: &World, n: usize) -> Vec<Uuid> {
    let ctx = Ctx::background();
    let mut schools = vec![world.school.id];
    for name in ["School No. 2", "School No. 3"] {
        let school = repos
            .catalog
            .create_school(
                &ctx,
                NewSchool {
                    organization_id: world.organization.id,
                    name: name.to_string(),
                },
            )
            .await
            .unwrap();
        schools.push(school.id);
    }

    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let school_id = schools[i % schools.len()];
        let user = repos
            .users
            .create(&ctx, new_user(&format!("director{i}@x.com")))
            .await
            .unwrap();
        let role = repos
            .user_roles
            .create(
                &ctx,
                NewUserRole {
                    user_id: user.id,
                    role: Role::Director,
                    scope: RoleScope::school(school_id),
                },
            )
            .await
            .unwrap();
        let director = repos
            .directors
            .create(
                &ctx,
                NewProfile {
                    role_id: role.id,
                    fields: NewDirector {
                        user_id: user.id,
                        school_id,
                        phone: None,
                        email: None,
                    },
                },
            )
            .await
            .unwrap();
        ids.push(director.id);
    }
    ids
}

async fn assert_batch_fetch_bound(n: usize) {
    let mut repos = Repositories::in_memory(MemoryStore::new());
    let users = CountingUsers::wrap(repos.users.clone());
    let catalog = CountingCatalog::wrap(repos.catalog.clone());
    repos.users = users.clone();
    repos.catalog = catalog.clone();
    let h = Harness::with(repos);
    let world = world(&h.services).await;
    seed_directors(&h.repos, &world, n).await;
    users.take();
    catalog.take();

    let (rows, total) = h
        .services
        .directors
        .list(&Ctx::background(), &ProfileQuery::default(), &all_rows())
        .await
        .unwrap();

    assert_eq!(rows.len(), n);
    assert_eq!(total, i64::try_from(n).unwrap());
    assert_eq!(users.take(), (0, 1), "user fetches for {n} directors");
    assert_eq!(catalog.take(), (0, 1, 1), "catalog fetches for {n} directors");
    assert!(rows.iter().all(|director| director.user.is_some()));
    assert!(rows.iter().all(|director| {
        director
            .school
            .as_ref()
            .is_some_and(|school| school.organization.is_some())
    }));
}

#[tokio::test]
async fn test_hydrating_one_director_fetches_once_per_aggregate() {
    assert_batch_fetch_bound(1).await;
}

#[tokio::test]
async fn test_hydrating_fifty_directors_fetches_once_per_aggregate() {
    assert_batch_fetch_bound(50).await;
}

#[tokio::test]
async fn test_hydrating_thousand_directors_fetches_once_per_aggregate() {
    assert_batch_fetch_bound(1000).await;
}

#[tokio::test]
async fn test_single_read_uses_by_id_lookups() {
    let mut repos = Repositories::in_memory(MemoryStore::new());
    let users = CountingUsers::wrap(repos.users.clone());
    let catalog = CountingCatalog::wrap(repos.catalog.clone());
    repos.users = users.clone();
    repos.catalog = catalog.clone();
    let h = Harness::with(repos);
    let world = world(&h.services).await;
    let ids = seed_directors(&h.repos, &world, 1).await;
    users.take();
    catalog.take();

    let director = h
        .services
        .directors
        .by_id(&Ctx::background(), ids[0])
        .await
        .unwrap();

    assert!(director.user.is_some());
    assert_eq!(users.take(), (1, 0));
    assert_eq!(catalog.take(), (1, 0, 1));
}

#[tokio::test]
async fn test_roles_across_organizations_share_one_organization_fetch() {
    let mut repos = Repositories::in_memory(MemoryStore::new());
    let catalog = CountingCatalog::wrap(repos.catalog.clone());
    repos.catalog = catalog.clone();
    let h = Harness::with(repos);
    let ctx = Ctx::background();
    let owned = world(&h.services).await;
    let directed = world(&h.services).await;
    let user = add_user(&h.services, "aziz@x.com").await;
    h.services
        .owners
        .add(&ctx, Owner::fields(user.id, &owned, None))
        .await
        .unwrap();
    h.services
        .directors
        .add(&ctx, Director::fields(user.id, &directed, None))
        .await
        .unwrap();
    catalog.take();

    let roles = h.services.identity.roles_of_user(&ctx, user.id).await.unwrap();

    assert_eq!(roles.len(), 2);
    assert_eq!(catalog.take(), (0, 1, 1));

    let owner = roles.iter().find(|role| role.role == Role::Owner).unwrap();
    let organization = owner.organization.as_ref().unwrap();
    assert_eq!(organization.id, owned.organization.id);

    let director = roles.iter().find(|role| role.role == Role::Director).unwrap();
    let school = director.school.as_ref().unwrap();
    assert_eq!(school.id, directed.school.id);
    let organization = school.organization.as_ref().unwrap();
    assert_eq!(organization.id, directed.organization.id);
}

#[tokio::test]
async fn test_empty_page_fetches_nothing() {
    let mut repos = Repositories::in_memory(MemoryStore::new());
    let users = CountingUsers::wrap(repos.users.clone());
    repos.users = users.clone();
    let h = Harness::with(repos);

    let (rows, total) = h
        .services
        .headmasters
        .list(&Ctx::background(), &ProfileQuery::default(), &all_rows())
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 0);
    assert_eq!(users.take(), (0, 0));
}

#[tokio::test]
async fn test_student_hydrates_group_with_grade_and_class_teacher() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;
    let teacher_user = add_user(&h.services, "teacher@x.com").await;
    let teacher = h
        .services
        .teachers
        .add(&ctx, Teacher::fields(teacher_user.id, &world, None))
        .await
        .unwrap();
    let group = h
        .services
        .catalog
        .add_group(
            &ctx,
            NewGroup {
                school_id: world.school.id,
                grade_id: world.grade.id,
                class_teacher_id: Some(teacher.id),
                name: "5B".to_string(),
            },
        )
        .await
        .unwrap();
    let student_user = add_user(&h.services, "kid@x.com").await;

    let student = h
        .services
        .students
        .add(
            &ctx,
            NewStudent {
                group_id: Some(group.id),
                ..Student::fields(student_user.id, &world, None)
            },
        )
        .await
        .unwrap();

    let hydrated = student.group.unwrap();
    assert_eq!(hydrated.id, group.id);
    assert_eq!(hydrated.grade.map(|grade| grade.level), Some(5));
    let class_teacher = hydrated.class_teacher.unwrap();
    assert_eq!(class_teacher.id, teacher.id);
    assert_eq!(class_teacher.first_name, "Aziz");

    let groups = h
        .services
        .catalog
        .groups_by_ids(&ctx, &[world.group.id, group.id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|group| group.grade.is_some()));
}

#[tokio::test]
async fn test_school_by_id_includes_organization() {
    let h = Harness::new();
    let ctx = Ctx::background();
    let world = world(&h.services).await;

    let school = h.services.catalog.school_by_id(&ctx, world.school.id).await.unwrap();
    assert_eq!(
        school.organization,
        Some(EduOrganizationShortInfo {
            id: world.organization.id,
            name: "Maorif".to_string(),
        })
    );

    let error = h
        .services
        .catalog
        .school_by_id(&ctx, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_duplicate_grade_level_is_conflict() {
    let h = Harness::new();
    let world = world(&h.services).await;

    let error = h
        .services
        .catalog
        .add_grade(
            &Ctx::background(),
            NewGrade {
                school_id: world.school.id,
                level: world.grade.level,
                name: "again".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_duplicate_user_email_is_conflict() {
    let h = Harness::new();
    add_user(&h.services, "same@x.com").await;

    let error = h
        .services
        .identity
        .add_user(&Ctx::background(), new_user("same@x.com"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Conflict);

    let found = h
        .services
        .identity
        .user_by_id(&Ctx::background(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(found.kind(), ErrorKind::NotFound);
}
