//! User entity and request inputs

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::occ::{Version, Versioned, INITIAL_VERSION, MAX_VERSION};
use crate::orders::Order;
use crate::store::RecordId;

use super::errors::UserError;

/// Accepted age range, inclusive
pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 150;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// A stored user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub email: String,
    pub age: i32,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Versioned for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> RecordId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// A user together with every order they own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithOrders {
    #[serde(flatten)]
    pub user: User,
    pub orders: Vec<Order>,
}

/// Columns written when a user is created
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewUser<'a> {
    pub email: &'a str,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/v1/users`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateInput {
    pub email: String,
    pub age: i32,
}

impl UserCreateInput {
    pub fn validate(&self) -> Result<(), UserError> {
        validate_email(&self.email)?;
        validate_age(self.age)
    }
}

/// Body of `PATCH /api/v1/users/:id`
///
/// `version` is the version the caller last read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    pub version: Version,
}

impl UserUpdateInput {
    pub fn validate(&self) -> Result<(), UserError> {
        if self.email.is_none() && self.age.is_none() {
            return Err(UserError::Validation(
                "at least one of email or age must be provided".to_string(),
            ));
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        if !(INITIAL_VERSION..=MAX_VERSION).contains(&self.version) {
            return Err(UserError::Validation(format!(
                "version must be between {} and {}, got {}",
                INITIAL_VERSION, MAX_VERSION, self.version
            )));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), UserError> {
    if email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(UserError::Validation(format!("invalid email: '{}'", email)))
    }
}

fn validate_age(age: i32) -> Result<(), UserError> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(UserError::Validation(format!(
            "age must be between {} and {}, got {}",
            MIN_AGE, MAX_AGE, age
        )))
    }
}
