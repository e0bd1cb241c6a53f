//! User store port - persisted user records

use crate::domain::result::Result;
use crate::domain::{PredicateSet, StoredFields, UserRecord};

/// A read against the user store
///
/// Matches records satisfying any predicate in `any_of`. With `active_only`
/// set, records whose active flag is explicitly false are excluded; records
/// that never had the flag written still match.
#[derive(Debug, Clone)]
pub struct UserQuery {
    pub any_of: PredicateSet,
    pub active_only: bool,
}

impl UserQuery {
    /// Any predicate, active records only
    pub fn active(any_of: PredicateSet) -> Self {
        Self { any_of, active_only: true }
    }

    /// Any predicate, regardless of the active flag
    pub fn unfiltered(any_of: PredicateSet) -> Self {
        Self { any_of, active_only: false }
    }
}

/// User store abstraction
///
/// Implementations provide the actual storage. Equality is type-sensitive:
/// a text phone predicate never matches a numeric stored phone, and the
/// other way round.
pub trait UserStore: Send + Sync {
    /// First matching record in the store's natural order, if any
    fn find_first(&self, query: &UserQuery) -> Result<Option<UserRecord>>;

    /// Every matching record in the store's natural order
    fn find_all(&self, query: &UserQuery) -> Result<Vec<UserRecord>>;

    /// Atomically create or update the record keyed by `email_key`
    ///
    /// A new record gets `email` as its stored email and is active unless
    /// `fields` says otherwise. An existing record only has the fields
    /// present in `fields` overwritten.
    fn upsert_by_email_key(
        &self,
        email_key: &str,
        email: &str,
        fields: &StoredFields,
    ) -> Result<UserRecord>;

    /// Insert a record exactly as given (imports and fixtures)
    fn insert(&self, record: &UserRecord) -> Result<()>;

    /// Number of stored records
    fn count(&self) -> Result<u64>;
}
