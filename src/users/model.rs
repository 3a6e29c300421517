use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Account role. Only `user` is ever assigned by registration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Admin satisfies every requirement.
    pub fn satisfies(&self, required: Role) -> bool {
        *self == Role::Admin || *self == required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("`{other}` is not a valid role")),
        }
    }
}

/// Stored user record. Never serialized to clients; see [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

/// Everything needed to persist a new user. The hash is computed before this
/// value exists.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Checks registration input, returning every violated rule in one message.
pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), String> {
    let mut problems = Vec::new();

    if name.trim().is_empty() {
        problems.push("name: Path `name` is required.".to_string());
    }

    if email.is_empty() {
        problems.push("email: Path `email` is required.".to_string());
    } else if !is_valid_email(email) {
        problems.push("email: Please use a valid email address".to_string());
    }

    if password.is_empty() {
        problems.push("password: Path `password` is required.".to_string());
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "password: Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(format!("User validation failed: {}", problems.join(", ")))
    }
}
