//! Upsert service - idempotent create-or-update of user records
//!
//! Records are keyed by lower-cased email. Used by administrative seeding;
//! it shares nothing with the resolve path except the email normalization.

use std::sync::Arc;

use crate::config::AdminDefaults;
use crate::domain::result::{Error, Result};
use crate::domain::{email_key, PhoneValue, StoredFields, UserFields, UserRecord};
use crate::ports::UserStore;
use crate::services::PasswordService;

/// Operator input for seeding an administrator
#[derive(Clone, Default)]
pub struct AdminSeed {
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub assignment: Option<i64>,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("phone", &self.phone)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("assignment", &self.assignment)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AdminSeed {
    /// Fill gaps from configured defaults; operator input wins
    pub fn with_defaults(self, defaults: &AdminDefaults) -> Self {
        Self {
            email: non_blank(self.email).or_else(|| non_blank(defaults.email.clone())),
            password: self.password.filter(|p| !p.is_empty()),
            phone: non_blank(self.phone).or_else(|| non_blank(defaults.phone.clone())),
            name: non_blank(self.name).or_else(|| non_blank(defaults.name.clone())),
            role: non_blank(self.role).or_else(|| non_blank(defaults.role.clone())),
            assignment: self.assignment.or(defaults.assignment),
        }
    }

    fn into_fields(self) -> UserFields {
        UserFields {
            phone: self.phone.map(PhoneValue::Text),
            name: self.name,
            role: self.role,
            password: self.password,
            assignment: self.assignment,
            is_active: None,
        }
    }
}

/// Upsert service for user records
pub struct UpsertService {
    store: Arc<dyn UserStore>,
    passwords: PasswordService,
}

impl UpsertService {
    pub fn new(store: Arc<dyn UserStore>, passwords: PasswordService) -> Self {
        Self { store, passwords }
    }

    /// Create or update the record for `email`
    ///
    /// A new record is active unless `fields` says otherwise. An existing one
    /// only has the fields present in `fields` overwritten. Calling twice with
    /// the same arguments leaves one record in the same state.
    pub fn upsert(&self, email: &str, fields: UserFields) -> Result<UserRecord> {
        let key = email_key(email);
        if key.is_empty() {
            return Err(Error::usage("email must not be empty"));
        }

        let password_hash = match fields.password.as_deref() {
            Some(p) if !p.is_empty() => Some(self.passwords.hash(p)?),
            _ => None,
        };

        let stored = StoredFields {
            phone: fields.phone,
            name: fields.name,
            role: fields.role,
            password_hash,
            assignment: fields.assignment,
            is_active: fields.is_active,
        };

        self.store.upsert_by_email_key(&key, &key, &stored)
    }

    /// Seed an administrator from operator input and configured defaults
    pub fn seed_admin(&self, seed: AdminSeed, defaults: &AdminDefaults) -> Result<UserRecord> {
        let seed = seed.with_defaults(defaults);
        let email = seed
            .email
            .clone()
            .ok_or_else(|| Error::usage("admin email is required"))?;
        self.upsert(&email, seed.into_fields())
    }

    /// Check a clear-text password against a stored record
    pub fn verify_password(&self, user: &UserRecord, password: &str) -> Result<bool> {
        match user.password_hash.as_deref() {
            Some(hash) => self.passwords.verify(password, hash),
            None => Ok(false),
        }
    }
}
