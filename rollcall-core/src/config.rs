//! Configuration management
//!
//! Settings live in `settings.json` in the app directory:
//! ```json
//! {
//!   "store": { "url": "duckdb:///var/lib/rollcall/users.duckdb" },
//!   "admin": { "email": "admin@example.com", "role": "admin" },
//!   "argon2": { "timeCost": 3, "memoryCost": 65536 }
//! }
//! ```
//! `ROLLCALL_DB_URL` overrides the store URL. Nothing else is read from the
//! environment here; callers pass the resulting `Config` in explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;

/// Environment variable holding the store connection string
pub const DB_URL_ENV: &str = "ROLLCALL_DB_URL";

/// Raw settings.json structure; keys other tools keep there are ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    store: StoreSettings,
    #[serde(default)]
    admin: AdminDefaults,
    #[serde(default)]
    argon2: Argon2Params,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSettings {
    #[serde(default)]
    url: Option<String>,
}

/// Defaults for administrator seeding, used where the operator gives nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<i64>,
}

/// Where the user store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    /// Parse a connection string
    ///
    /// Accepted forms: `duckdb:///abs/path.duckdb`, `duckdb:rel/path.duckdb`,
    /// `file:///abs/path.duckdb`, `:memory:` (or `duckdb::memory:`), and a
    /// bare filesystem path.
    pub fn parse(conn: &str) -> Result<Self> {
        let conn = conn.trim();
        if conn.is_empty() {
            return Err(Error::config("store connection string is empty"));
        }
        if conn == ":memory:" {
            return Ok(Self::Memory);
        }
        if !conn.contains("://") && !conn.starts_with("duckdb:") {
            return Ok(Self::File(PathBuf::from(conn)));
        }

        let url = Url::parse(conn)
            .map_err(|e| Error::config(format!("invalid store URL: {}", e)))?;
        match url.scheme() {
            "duckdb" => match url.path() {
                ":memory:" => Ok(Self::Memory),
                "" | "/" => Err(Error::config("store URL has no database path")),
                // Absolute paths arrive percent-encoded; decode them as a file URL would
                path if path.starts_with('/') => {
                    let mut file_url = Url::parse("file:///")
                        .map_err(|e| Error::config(format!("invalid store URL: {}", e)))?;
                    if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
                        file_url
                            .set_host(Some(host))
                            .map_err(|e| Error::config(format!("invalid store URL: {}", e)))?;
                    }
                    file_url.set_path(path);
                    file_path(&file_url)
                }
                path => Ok(Self::File(PathBuf::from(path))),
            },
            "file" => file_path(&url),
            other => Err(Error::config(format!(
                "unsupported store scheme '{}' (expected duckdb or file)",
                other
            ))),
        }
    }
}

fn file_path(url: &Url) -> Result<StoreLocation> {
    url.to_file_path()
        .map(StoreLocation::File)
        .map_err(|_| Error::config("store URL is not a local file path"))
}

/// Rollcall configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Store connection string; `None` when nothing configured one
    pub store_url: Option<String>,
    pub admin: AdminDefaults,
    pub argon2: Argon2Params,
}

impl Config {
    /// Load config from the app directory, with environment overrides
    pub fn load(app_dir: &Path) -> Result<Self> {
        Self::load_with_env(app_dir, |key| std::env::var(key).ok())
    }

    /// Load config with an explicit environment lookup
    pub fn load_with_env<F>(app_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = app_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("invalid settings.json: {}", e)))?
        } else {
            SettingsFile::default()
        };

        let store_url = env(DB_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| raw.store.url.clone());

        Ok(Self {
            store_url,
            admin: raw.admin,
            argon2: raw.argon2,
        })
    }

    /// Override the store connection string (e.g. from a command-line flag)
    pub fn with_store_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.store_url = Some(url);
        }
        self
    }

    /// Resolve the configured store location
    ///
    /// Fails when no connection string is configured anywhere.
    pub fn store_location(&self) -> Result<StoreLocation> {
        match self.store_url.as_deref() {
            Some(url) => StoreLocation::parse(url),
            None => Err(Error::config(format!(
                "store connection string is not set (use --db, {} or settings.json)",
                DB_URL_ENV
            ))),
        }
    }
}
