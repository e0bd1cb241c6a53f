//! User domain model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalize an email into the upsert key: trimmed and lower-cased
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A stored phone value
///
/// Records written by different tools hold the phone either as text or as
/// a number, so both shapes are kept as-is rather than coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhoneValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for PhoneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneValue::Integer(n) => write!(f, "{}", n),
            PhoneValue::Text(s) => f.write_str(s),
        }
    }
}

/// A persisted user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    /// Stored exactly as written; may not be lower-case
    pub email: String,
    pub phone: Option<PhoneValue>,
    pub name: Option<String>,
    pub role: Option<String>,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Numeric assignment (e.g. a constituency number)
    pub assignment: Option<i64>,
    /// `None` means the flag was never written, which counts as active
    pub is_active: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            phone: None,
            name: None,
            role: None,
            password_hash: None,
            assignment: None,
            is_active: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phone(mut self, phone: PhoneValue) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    /// Active unless explicitly switched off
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

/// Fields supplied to an upsert; `None` leaves the stored value untouched
#[derive(Clone, Default)]
pub struct UserFields {
    pub phone: Option<PhoneValue>,
    pub name: Option<String>,
    pub role: Option<String>,
    /// Clear-text secret. Hashed before it reaches the store.
    pub password: Option<String>,
    pub assignment: Option<i64>,
    pub is_active: Option<bool>,
}

impl UserFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phone(mut self, phone: PhoneValue) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn assignment(mut self, assignment: i64) -> Self {
        self.assignment = Some(assignment);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }
}

// Hand-written so the clear-text password never lands in a log or panic message
impl fmt::Debug for UserFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFields")
            .field("phone", &self.phone)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("assignment", &self.assignment)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Same fields as `UserFields` after the password has been hashed
#[derive(Debug, Clone, Default)]
pub struct StoredFields {
    pub phone: Option<PhoneValue>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub password_hash: Option<String>,
    pub assignment: Option<i64>,
    pub is_active: Option<bool>,
}
