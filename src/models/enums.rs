//! Text-backed enumerations shared by the identity and profile models.
//!
//! Each enum is stored as lowercase `TEXT` and parses case-insensitively from
//! caller input; unknown values are rejected as bad requests.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use diesel::AsExpression;
use diesel::FromSqlRow;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            AsExpression,
            FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_ascii_lowercase();
                match lowered.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(AppError::bad_request(format!(
                        "Unrecognized {}: {}",
                        $label, s
                    ))),
                }
            }
        }

        impl diesel::query_builder::QueryId for $name {
            type QueryId = $name;
            const HAS_STATIC_QUERY_ID: bool = false;
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(serialize::IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(
                bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
            ) -> deserialize::Result<Self> {
                let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                $name::from_str(&s)
                    .map_err(|_| format!("Unrecognized {}: {}", $label, s).into())
            }
        }
    };
}

text_enum! {
    /// Role a user holds inside a school or organization.
    Role, "role" {
        Owner => "owner",
        Director => "director",
        Headmaster => "headmaster",
        Teacher => "teacher",
        Student => "student",
        Guardian => "guardian",
    }
}

text_enum! {
    Gender, "gender" {
        Male => "male",
        Female => "female",
    }
}

text_enum! {
    /// Relation of a guardian to the student they are attached to.
    GuardianRelation, "guardian relation" {
        Father => "father",
        Mother => "mother",
        Brother => "brother",
        Sister => "sister",
        Grandfather => "grandfather",
        Grandmother => "grandmother",
        Uncle => "uncle",
        Aunt => "aunt",
        Other => "other",
    }
}

/// Which scope column a role must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    School,
    Organization,
}

impl Role {
    /// Guardians may hold any number of role rows in the same school.
    pub fn is_scope_unique(&self) -> bool {
        !matches!(self, Role::Guardian)
    }

    pub fn scope_kind(&self) -> ScopeKind {
        match self {
            Role::Owner => ScopeKind::Organization,
            _ => ScopeKind::School,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Director".parse::<Role>().unwrap(), Role::Director);
        assert_eq!(" GUARDIAN ".parse::<Role>().unwrap(), Role::Guardian);
    }

    #[test]
    fn test_unknown_values_are_bad_requests() {
        let error = "janitor".parse::<Role>().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert!("x".parse::<Gender>().is_err());
        assert!("cousin".parse::<GuardianRelation>().is_err());
    }

    #[test]
    fn test_display_round_trips_every_variant() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), *role);
        }
        for relation in GuardianRelation::ALL {
            assert_eq!(
                relation.as_str().parse::<GuardianRelation>().unwrap(),
                *relation
            );
        }
    }

    #[test]
    fn test_role_scope_rules() {
        assert!(!Role::Guardian.is_scope_unique());
        assert!(Role::Teacher.is_scope_unique());
        assert_eq!(Role::Owner.scope_kind(), ScopeKind::Organization);
        assert_eq!(Role::Student.scope_kind(), ScopeKind::School);
    }
}
