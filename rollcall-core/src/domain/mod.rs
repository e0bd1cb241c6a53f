//! Core domain entities
//!
//! Identifiers, candidates, predicates and user records. These are pure
//! data structures with validation logic - no I/O or external dependencies.

pub mod hashing;
pub mod identifier;
pub mod predicate;
pub mod result;
mod user;

pub use hashing::Argon2Params;
pub use identifier::{normalize, CandidateSet, CandidateValue, RawIdentifier};
pub use predicate::{build_predicates, predicates_for, Field, Predicate, PredicateSet};
pub use user::{email_key, PhoneValue, StoredFields, UserFields, UserRecord};
