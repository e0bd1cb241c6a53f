//! CLI command implementations

pub mod logs;
pub mod lookup;
pub mod seed;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use rollcall_core::config::Config;
use rollcall_core::{EntryPoint, LogEvent, LoggingService, RollcallContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let app_dir = get_app_dir().ok()?;
    std::fs::create_dir_all(&app_dir).ok()?;
    LoggingService::new(&app_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log label for an error; never the message, which may echo input
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<rollcall_core::Error>()
        .map(|e| e.kind())
        .unwrap_or("other")
}

/// App directory from ROLLCALL_DIR, or ~/.rollcall
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ROLLCALL_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".rollcall"))
        .ok_or_else(|| anyhow!("Could not find home directory; set ROLLCALL_DIR"))
}

/// Load configuration, applying a --db override
pub fn get_config(db: Option<String>) -> Result<Config> {
    let app_dir = get_app_dir()?;
    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create rollcall directory: {:?}", app_dir))?;

    let config = Config::load(&app_dir).context("Failed to load settings")?;
    Ok(config.with_store_url(db))
}

/// Open the store and build the context
pub fn get_context(config: Config) -> Result<RollcallContext> {
    Ok(RollcallContext::new(config)?)
}
