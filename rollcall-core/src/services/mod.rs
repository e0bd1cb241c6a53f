//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and the user store port. Resolution and
//! upsert are independent; they only share email normalization.

pub mod logging;
pub mod migration;
mod password;
mod resolve;
mod upsert;

pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use password::PasswordService;
pub use resolve::{LookupPlan, ResolveService, ResolveStrategy};
pub use upsert::{AdminSeed, UpsertService};
