//! User store migrations, embedded with include_str!
//!
//! Applied in list order by `MigrationService` and recorded by file name in
//! sys_migrations. New files are named NNN_description.sql and appended here.

/// (filename, sql) pairs, in application order
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_users.sql", include_str!("001_users.sql")),
];
