mod catalog;
mod director;
mod enums;
mod filter;
mod guardian;
mod headmaster;
mod owner;
mod profile;
mod relations;
mod student;
mod teacher;
mod user;

pub use catalog::{
    EduOrganization, EduOrganizationShortInfo, Grade, Group, GroupShortInfo, NewEduOrganization,
    NewGrade, NewGroup, NewSchool, School, SchoolShortInfo, StudentShortInfo, TeacherShortInfo,
};
pub use director::{Director, NewDirector};
pub use enums::{Gender, GuardianRelation, Role, ScopeKind};
pub use filter::{DateFilter, ListFilter, MAX_PER_PAGE, Pagination, SortOrder};
pub use guardian::{GuardianQuery, NewGuardianLink, NewStudentGuardian, StudentGuardian};
pub use headmaster::{Headmaster, NewHeadmaster};
pub use owner::{NewOwner, Owner};
pub use profile::{NewProfile, Profile, ProfileQuery};
pub use relations::{Hydrate, Related, RelationKeys, hydrate_all, index_by_id};
pub use student::{NewStudent, Student};
pub use teacher::{NewTeacher, Teacher};
pub use user::{NewUser, NewUserRole, RoleScope, User, UserRole};
