//! Rollcall Core - identifier resolution and user matching
//!
//! Turns a free-form identifier (email, phone number in any common format)
//! into store predicates and finds the user it refers to. Also provides an
//! idempotent upsert keyed by normalized email, used to seed administrators.
//!
//! Layout follows hexagonal architecture:
//!
//! - **domain**: identifiers, candidates, predicates, user records
//! - **ports**: the `UserStore` trait
//! - **services**: resolution, upsert, password hashing, logging
//! - **adapters**: DuckDB implementation of `UserStore`

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::{Config, StoreLocation};
use services::*;

// Re-export commonly used types at crate root
pub use config::AdminDefaults;
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{
    build_predicates, normalize, CandidateSet, CandidateValue, PhoneValue, Predicate,
    PredicateSet, RawIdentifier, UserFields, UserRecord,
};
pub use ports::{UserQuery, UserStore};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for Rollcall operations
///
/// Holds the configuration, the opened store and the services wired to it.
pub struct RollcallContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub resolve_service: ResolveService,
    pub upsert_service: UpsertService,
}

impl RollcallContext {
    /// Open the configured store, apply migrations and build the services
    pub fn new(config: Config) -> Result<Self> {
        let repository = match config.store_location()? {
            StoreLocation::File(path) => DuckDbRepository::new(&path)?,
            StoreLocation::Memory => DuckDbRepository::open_in_memory()?,
        };
        Self::with_repository(config, Arc::new(repository))
    }

    /// Build the context around an already opened repository
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Result<Self> {
        repository.ensure_schema()?;

        let resolve_service = ResolveService::new(repository.clone());
        let upsert_service = UpsertService::new(
            repository.clone(),
            PasswordService::new(config.argon2.clone()),
        );

        Ok(Self {
            config,
            repository,
            resolve_service,
            upsert_service,
        })
    }
}
