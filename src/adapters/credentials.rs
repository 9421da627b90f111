use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

pub const LATEST_SCHEMA_VERSION: u32 = 1;
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const DEFAULT_DB_PATH: &str = "./data/credentials.db";

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS credentials (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
)];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub trait CredentialStore: Send + Sync + 'static {
    fn read(&self, key: &str) -> Result<Option<String>, DbError>;
    fn write(&self, key: &str, value: &str) -> Result<(), DbError>;
    fn remove(&self, key: &str) -> Result<bool, DbError>;
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Credential store backed by a SQLite file. A connection is opened per call so
/// the store stays `Sync` and never holds the file open between screen focuses.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    path: String,
}

impl SqliteCredentialStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the file, creating the schema if needed.
    pub fn initialize(path: impl Into<String>) -> Result<Self, DbError> {
        let store = Self::new(path);
        let mut connection = open_connection(&store.path)?;
        run_migrations(&mut connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn read(&self, key: &str) -> Result<Option<String>, DbError> {
        let connection = open_connection(&self.path)?;
        let value = connection
            .query_row(
                "SELECT value FROM credentials WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DbError> {
        let connection = open_connection(&self.path)?;
        connection.execute(
            "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                key,
                value,
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, DbError> {
        let connection = open_connection(&self.path)?;
        let removed = connection.execute("DELETE FROM credentials WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

/// Reads the persisted auth token. Storage failures are logged and treated as
/// "no token" so the request still goes out unauthenticated.
pub fn read_token<S: CredentialStore + ?Sized>(store: &S) -> Option<String> {
    match store.read(AUTH_TOKEN_KEY) {
        Ok(token) => token,
        Err(error) => {
            tracing::warn!(error = %error, key = AUTH_TOKEN_KEY, "failed to read auth token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{
        AUTH_TOKEN_KEY, CredentialStore, LATEST_SCHEMA_VERSION, SqliteCredentialStore,
        open_connection, read_token, run_migrations, schema_version,
    };

    fn temp_db_path(name: &str) -> PathBuf {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(name);
        std::mem::forget(dir);
        path
    }

    fn initialized_store(name: &str) -> SqliteCredentialStore {
        let path = temp_db_path(name);
        SqliteCredentialStore::initialize(path.to_string_lossy().into_owned())
            .expect("store should initialize")
    }

    #[test]
    fn migrates_fresh_database_to_latest_version() {
        let db_path = temp_db_path("fresh.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("migrations should succeed");

        let version = schema_version(&connection).expect("schema version should be queryable");
        assert_eq!(version, LATEST_SCHEMA_VERSION);

        let table_exists: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='credentials'",
                [],
                |row| row.get(0),
            )
            .expect("credentials table check should work");
        assert_eq!(table_exists, 1);
    }

    #[test]
    fn migrations_are_idempotent() {
        let db_path = temp_db_path("idempotent.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("first migration run should succeed");
        run_migrations(&mut connection).expect("second migration run should succeed");

        let version = schema_version(&connection).expect("schema version should be queryable");
        assert_eq!(version, LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn rejects_newer_schema_version() {
        let db_path = temp_db_path("future.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        connection
            .pragma_update(None, "user_version", LATEST_SCHEMA_VERSION + 1)
            .expect("pragma update should succeed");

        let result = run_migrations(&mut connection);

        assert!(result.is_err());
    }

    #[test]
    fn reads_back_written_token() {
        let store = initialized_store("roundtrip.sqlite");

        store
            .write(AUTH_TOKEN_KEY, "token-abc")
            .expect("write should succeed");

        assert_eq!(read_token(&store).as_deref(), Some("token-abc"));
    }

    #[test]
    fn overwrites_existing_token() {
        let store = initialized_store("overwrite.sqlite");

        store.write(AUTH_TOKEN_KEY, "old").expect("write should succeed");
        store.write(AUTH_TOKEN_KEY, "new").expect("write should succeed");

        assert_eq!(
            store.read(AUTH_TOKEN_KEY).expect("read should succeed"),
            Some("new".to_string())
        );
    }

    #[test]
    fn missing_token_is_none() {
        let store = initialized_store("empty.sqlite");

        assert_eq!(read_token(&store), None);
    }

    #[test]
    fn remove_reports_whether_a_value_existed() {
        let store = initialized_store("remove.sqlite");
        store.write(AUTH_TOKEN_KEY, "t").expect("write should succeed");

        assert!(store.remove(AUTH_TOKEN_KEY).expect("remove should succeed"));
        assert!(!store.remove(AUTH_TOKEN_KEY).expect("remove should succeed"));
        assert_eq!(read_token(&store), None);
    }

    #[test]
    fn storage_failure_reads_as_no_token() {
        let path = temp_db_path("unmigrated.sqlite");
        let store = SqliteCredentialStore::new(path.to_string_lossy().into_owned());

        assert!(store.read(AUTH_TOKEN_KEY).is_err());
        assert_eq!(read_token(&store), None);
    }
}
