//! DuckDB user store implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{email_key, CandidateValue, PhoneValue, Predicate, StoredFields, UserRecord};
use crate::ports::{UserQuery, UserStore};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Column list shared by every user SELECT; `row_to_user` reads by these indices
const USER_COLUMNS: &str = "user_id, email, phone_text, phone_number, name, role, \
                            password_hash, assignment, is_active, created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// DuckDB repository implementation
///
/// A single connection behind a mutex. Share it across threads with `Arc`.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a file-backed user store
    ///
    /// Retries with exponential backoff on file locking errors, which occur
    /// when another process still holds the database file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[rollcall] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Other(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs an extension
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn select_matching(&self, query: &UserQuery, limit: Option<usize>) -> Result<Vec<UserRecord>> {
        let (where_sql, values) = where_clause(query);
        let mut sql = format!(
            "SELECT {} FROM sys_users WHERE {} ORDER BY rowid",
            USER_COLUMNS, where_sql
        );
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(values.iter()), row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

impl UserStore for DuckDbRepository {
    fn find_first(&self, query: &UserQuery) -> Result<Option<UserRecord>> {
        Ok(self.select_matching(query, Some(1))?.into_iter().next())
    }

    fn find_all(&self, query: &UserQuery) -> Result<Vec<UserRecord>> {
        self.select_matching(query, None)
    }

    /// Insert-if-absent followed by an update of the supplied fields, in one
    /// transaction. The UNIQUE constraint on email_key turns a concurrent
    /// second insert into a no-op, so both writers end on the same row.
    fn upsert_by_email_key(
        &self,
        email_key: &str,
        email: &str,
        fields: &StoredFields,
    ) -> Result<UserRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO sys_users (user_id, email_key, email, is_active, created_at, updated_at)
             VALUES (?, ?, ?, TRUE, ?, ?)
             ON CONFLICT (email_key) DO NOTHING",
            params![Uuid::new_v4().to_string(), email_key, email, now, now],
        )?;

        let phone_given = fields.phone.is_some();
        let (phone_text, phone_number) = split_phone(fields.phone.as_ref());

        // A new phone replaces both typed columns so only one of them is ever set
        tx.execute(
            "UPDATE sys_users SET
                phone_text = CASE WHEN ? THEN ? ELSE phone_text END,
                phone_number = CASE WHEN ? THEN ? ELSE phone_number END,
                name = COALESCE(?, name),
                role = COALESCE(?, role),
                password_hash = COALESCE(?, password_hash),
                assignment = COALESCE(?, assignment),
                is_active = COALESCE(?, is_active),
                updated_at = ?
             WHERE email_key = ?",
            params![
                phone_given,
                phone_text,
                phone_given,
                phone_number,
                fields.name,
                fields.role,
                fields.password_hash,
                fields.assignment,
                fields.is_active,
                now,
                email_key,
            ],
        )?;

        let record = tx.query_row(
            &format!("SELECT {} FROM sys_users WHERE email_key = ?", USER_COLUMNS),
            params![email_key],
            row_to_user,
        )?;

        tx.commit()?;
        Ok(record)
    }

    fn insert(&self, record: &UserRecord) -> Result<()> {
        let conn = self.lock()?;
        let (phone_text, phone_number) = split_phone(record.phone.as_ref());

        conn.execute(
            "INSERT INTO sys_users (user_id, email_key, email, phone_text, phone_number, name, role,
                                    password_hash, assignment, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                email_key(&record.email),
                record.email,
                phone_text,
                phone_number,
                record.name,
                record.role,
                record.password_hash,
                record.assignment,
                record.is_active,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_users", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Build the WHERE clause and its parameters for a query
///
/// Each predicate targets the column holding its value's type, which is
/// what keeps `"123"` and `123` apart.
fn where_clause(query: &UserQuery) -> (String, Vec<Value>) {
    let mut terms = Vec::with_capacity(query.any_of.len());
    let mut values = Vec::with_capacity(query.any_of.len());

    for predicate in &query.any_of {
        let (term, value) = match predicate {
            Predicate::Email(v) => ("email = ?", Value::Text(v.clone())),
            Predicate::Phone(CandidateValue::Text(v)) => ("phone_text = ?", Value::Text(v.clone())),
            Predicate::Phone(CandidateValue::Integer(n)) => ("phone_number = ?", Value::BigInt(*n)),
        };
        terms.push(term);
        values.push(value);
    }

    // An empty OR matches nothing
    let any = if terms.is_empty() {
        "FALSE".to_string()
    } else {
        format!("({})", terms.join(" OR "))
    };

    let sql = if query.active_only {
        format!("{} AND (is_active IS NULL OR is_active = TRUE)", any)
    } else {
        any
    };

    (sql, values)
}

fn split_phone(phone: Option<&PhoneValue>) -> (Option<String>, Option<i64>) {
    match phone {
        Some(PhoneValue::Text(s)) => (Some(s.clone()), None),
        Some(PhoneValue::Integer(n)) => (None, Some(*n)),
        None => (None, None),
    }
}

fn row_to_user(row: &duckdb::Row) -> duckdb::Result<UserRecord> {
    // Column indices from USER_COLUMNS:
    // 0: user_id, 1: email, 2: phone_text, 3: phone_number, 4: name, 5: role,
    // 6: password_hash, 7: assignment, 8: is_active, 9: created_at, 10: updated_at
    let id_str: String = row.get(0)?;
    let phone_text: Option<String> = row.get(2)?;
    let phone_number: Option<i64> = row.get(3)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    let phone = match (phone_number, phone_text) {
        (Some(n), _) => Some(PhoneValue::Integer(n)),
        (None, Some(s)) => Some(PhoneValue::Text(s)),
        (None, None) => None,
    };

    Ok(UserRecord {
        id: Uuid::parse_str(&id_str).map_err(|e| conversion_error(0, e))?,
        email: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        phone,
        name: row.get(4)?,
        role: row.get(5)?,
        password_hash: row.get(6)?,
        assignment: row.get(7)?,
        is_active: row.get(8)?,
        created_at: parse_timestamp(9, &created_str)?,
        updated_at: parse_timestamp(10, &updated_str)?,
    })
}

// Helper functions

fn conversion_error<E>(idx: usize, err: E) -> duckdb::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    duckdb::Error::FromSqlConversionFailure(idx, duckdb::types::Type::Text, Box::new(err))
}

/// RFC 3339 as written by this crate, or DuckDB's own `YYYY-MM-DD HH:MM:SS` form read as UTC
fn parse_timestamp(idx: usize, s: &str) -> duckdb::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.and_utc())
        })
        .map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredicateSet;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn phone_text(v: &str) -> Predicate {
        Predicate::Phone(CandidateValue::Text(v.to_string()))
    }

    fn phone_number(n: i64) -> Predicate {
        Predicate::Phone(CandidateValue::Integer(n))
    }

    fn query(preds: Vec<Predicate>) -> UserQuery {
        UserQuery::active(preds.into_iter().collect())
    }

    #[test]
    fn test_where_clause_active_filter() {
        let (sql, values) = where_clause(&query(vec![
            Predicate::Email("a@b.com".to_string()),
            phone_number(42),
        ]));
        assert!(sql.contains("email = ?"));
        assert!(sql.contains("phone_number = ?"));
        assert!(sql.contains(" OR "));
        assert!(sql.ends_with("(is_active IS NULL OR is_active = TRUE)"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_where_clause_unfiltered() {
        let (sql, _) = where_clause(&UserQuery::unfiltered(vec![phone_text("1")].into_iter().collect()));
        assert_eq!(sql, "(phone_text = ?)");
    }

    #[test]
    fn test_where_clause_empty_matches_nothing() {
        let (sql, values) = where_clause(&UserQuery::unfiltered(PredicateSet::new()));
        assert_eq!(sql, "FALSE");
        assert!(values.is_empty());
    }

    #[test]
    fn test_phone_type_sensitive_match() {
        let repo = repo();
        repo.insert(&UserRecord::new("text@x.com").with_phone(PhoneValue::Text("9438804293".into())))
            .unwrap();
        repo.insert(&UserRecord::new("num@x.com").with_phone(PhoneValue::Integer(9876543210)))
            .unwrap();

        let found = repo.find_first(&query(vec![phone_text("9438804293")])).unwrap().unwrap();
        assert_eq!(found.email, "text@x.com");
        assert!(repo.find_first(&query(vec![phone_number(9438804293)])).unwrap().is_none());

        let found = repo.find_first(&query(vec![phone_number(9876543210)])).unwrap().unwrap();
        assert_eq!(found.email, "num@x.com");
        assert_eq!(found.phone, Some(PhoneValue::Integer(9876543210)));
        assert!(repo.find_first(&query(vec![phone_text("9876543210")])).unwrap().is_none());
    }

    #[test]
    fn test_active_filter() {
        let repo = repo();
        repo.insert(&UserRecord::new("absent@x.com")).unwrap();
        repo.insert(&UserRecord::new("off@x.com").with_active(false)).unwrap();

        let absent = query(vec![Predicate::Email("absent@x.com".into())]);
        assert!(repo.find_first(&absent).unwrap().is_some());

        let off = vec![Predicate::Email("off@x.com".into())];
        assert!(repo.find_first(&query(off.clone())).unwrap().is_none());
        assert!(repo
            .find_first(&UserQuery::unfiltered(off.into_iter().collect()))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_find_all_in_insertion_order() {
        let repo = repo();
        for email in ["first@x.com", "second@x.com", "third@x.com"] {
            repo.insert(&UserRecord::new(email).with_phone(PhoneValue::Text("555".into())))
                .unwrap();
        }
        let all = repo.find_all(&query(vec![phone_text("555")])).unwrap();
        let emails: Vec<_> = all.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["first@x.com", "second@x.com", "third@x.com"]);

        let first = repo.find_first(&query(vec![phone_text("555")])).unwrap().unwrap();
        assert_eq!(first.email, "first@x.com");
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let repo = repo();
        let fields = StoredFields {
            name: Some("X".into()),
            phone: Some(PhoneValue::Text("111".into())),
            ..Default::default()
        };
        let created = repo.upsert_by_email_key("a@b.com", "a@b.com", &fields).unwrap();
        assert_eq!(created.is_active, Some(true));
        assert_eq!(created.name.as_deref(), Some("X"));

        let update = StoredFields {
            role: Some("admin".into()),
            phone: Some(PhoneValue::Integer(222)),
            ..Default::default()
        };
        let updated = repo.upsert_by_email_key("a@b.com", "a@b.com", &update).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name.as_deref(), Some("X"));
        assert_eq!(updated.role.as_deref(), Some("admin"));
        assert_eq!(updated.phone, Some(PhoneValue::Integer(222)));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_duplicate_email_key_is_store_error() {
        let repo = repo();
        repo.insert(&UserRecord::new("Dup@x.com")).unwrap();
        let err = repo.insert(&UserRecord::new("dup@X.com")).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    fn insert_raw(repo: &DuckDbRepository, user_id: &str, created_at: &str) {
        let conn = repo.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_users (user_id, email_key, email, phone_text, created_at, updated_at)
             VALUES (?, 'raw@x.com', 'raw@x.com', '5550001111', ?, ?)",
            params![user_id, created_at, created_at],
        )
        .unwrap();
    }

    #[test]
    fn test_malformed_user_id_is_store_error() {
        let repo = repo();
        insert_raw(&repo, "not-a-uuid", "2024-01-01T00:00:00Z");
        let err = repo.find_all(&query(vec![phone_text("5550001111")])).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_malformed_timestamp_is_store_error() {
        let repo = repo();
        insert_raw(&repo, &Uuid::new_v4().to_string(), "yesterday");
        let err = repo.find_first(&query(vec![phone_text("5550001111")])).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_duckdb_timestamp_format_is_read_as_utc() {
        let repo = repo();
        insert_raw(&repo, &Uuid::new_v4().to_string(), "2024-03-05 10:20:30");
        let user = repo.find_first(&query(vec![phone_text("5550001111")])).unwrap().unwrap();
        assert_eq!(user.created_at.to_rfc3339(), "2024-03-05T10:20:30+00:00");
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("database is locked"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }
}
