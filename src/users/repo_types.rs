use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Access eligibility of an account, stored as text in `users.is_restricted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictionStatus {
    #[default]
    Valido,
    Invalido,
    Restringido,
}

impl RestrictionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valido => "Valido",
            Self::Invalido => "Invalido",
            Self::Restringido => "Restringido",
        }
    }

    /// Next state of the restrict toggle. Only `Valido` moves to `Invalido`;
    /// everything else settles on `Restringido`.
    pub fn restricted(self) -> Self {
        match self {
            Self::Valido => Self::Invalido,
            Self::Invalido | Self::Restringido => Self::Restringido,
        }
    }

    /// Values a caller may set directly through the update endpoints.
    pub fn assignable(self) -> bool {
        matches!(self, Self::Valido | Self::Restringido)
    }
}

impl fmt::Display for RestrictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestrictionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valido" => Ok(Self::Valido),
            "Invalido" => Ok(Self::Invalido),
            "Restringido" => Ok(Self::Restringido),
            other => anyhow::bail!("unknown restriction status {other:?}"),
        }
    }
}

/// Raw `users` row as returned by Postgres.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub is_restricted: String,
    pub created_by: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// User account. The password digest never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_restricted: RestrictionStatus,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            lastname: r.lastname,
            email: r.email,
            phone: r.phone,
            password: r.password,
            is_restricted: r.is_restricted.parse()?,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Fields required to insert a user; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub created_by: String,
}

/// One page of rows plus the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restrict_walks_valido_invalido_restringido() {
        let s = RestrictionStatus::default();
        assert_eq!(s, RestrictionStatus::Valido);
        let s = s.restricted();
        assert_eq!(s, RestrictionStatus::Invalido);
        let s = s.restricted();
        assert_eq!(s, RestrictionStatus::Restringido);
        assert_eq!(s.restricted(), RestrictionStatus::Restringido);
    }

    #[test]
    fn status_parses_only_known_values() {
        for s in ["Valido", "Invalido", "Restringido"] {
            assert_eq!(s.parse::<RestrictionStatus>().unwrap().as_str(), s);
        }
        assert!("valido".parse::<RestrictionStatus>().is_err());
        assert!("".parse::<RestrictionStatus>().is_err());
    }

    #[test]
    fn invalido_is_not_assignable() {
        assert!(RestrictionStatus::Valido.assignable());
        assert!(RestrictionStatus::Restringido.assignable());
        assert!(!RestrictionStatus::Invalido.assignable());
    }

    #[test]
    fn serialized_user_omits_password() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            lastname: "Perez".into(),
            email: "ana@example.com".into(),
            phone: "5512345678".into(),
            password: "$argon2id$secret".into(),
            is_restricted: RestrictionStatus::Valido,
            created_by: "admin".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["is_restricted"], "Valido");
        assert_eq!(json["email"], "ana@example.com");
    }
}
