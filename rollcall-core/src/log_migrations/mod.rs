//! Event log migrations, embedded with include_str!
//!
//! Tracked in the logs database's own sys_migrations table, independent of
//! the user store's migrations.

/// (filename, sql) pairs, in application order
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_event_log.sql", include_str!("001_event_log.sql")),
];
