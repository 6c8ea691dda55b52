//! Database connection management and schema setup

use rusqlite::{Connection, ErrorCode, Transaction};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use super::paper_repo::PaperRepo;

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Schema initialization failed: {0}")]
    SchemaFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                return DatabaseError::ConstraintViolation(
                    msg.clone().unwrap_or_else(|| code.to_string()),
                );
            }
        }
        DatabaseError::Sqlite(err)
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Owner of the single SQLite connection.
///
/// The connection is opened lazily by [`Database::connect`] and reopened by
/// the next operation after [`Database::close`].
pub struct Database {
    config: DatabaseConfig,
    conn: Option<Connection>,
}

impl Database {
    /// Create an unconnected handle
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, conn: None }
    }

    /// Private in-memory store with the schema in place
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let mut db = Self::new(DatabaseConfig::in_memory());
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Return the active connection, opening it on first use
    pub fn connect(&mut self) -> DatabaseResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => open_connection(&self.config)?,
        };
        Ok(self.conn.insert(conn))
    }

    /// Create the papers table and its indexes if they are missing.
    ///
    /// Safe to run on every start; existing rows are untouched.
    pub fn initialize_schema(&mut self) -> DatabaseResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(include_str!("schema.sql"))
            .map_err(|e| DatabaseError::SchemaFailed(e.to_string()))?;
        debug!("Schema ready");
        Ok(())
    }

    /// Release the connection. No-op when not connected.
    pub fn close(&mut self) -> DatabaseResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        info!("Closing database at {:?}", self.config.path);
        conn.close().map_err(|(_, e)| {
            error!("Failed to close database cleanly: {}", e);
            DatabaseError::from(e)
        })
    }

    /// Run `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back and returns the error
    /// otherwise. A panic inside `f` drops the guard, which also rolls back.
    pub fn transaction<F, T>(&mut self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DatabaseResult<T>,
    {
        let conn = self.connect()?;
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rolling back transaction: {}", err);
                if let Err(rollback_err) = tx.rollback() {
                    error!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Paper repository bound to this store
    pub fn papers(&mut self) -> PaperRepo<'_> {
        PaperRepo::new(self)
    }
}

/// Open or create a database at `path` and make sure the schema exists
pub fn open_database(path: &Path) -> DatabaseResult<Database> {
    let mut db = Database::new(DatabaseConfig::with_path(path));
    db.initialize_schema()?;
    Ok(db)
}

fn open_connection(config: &DatabaseConfig) -> DatabaseResult<Connection> {
    info!("Opening database at {:?}", config.path);

    if !config.is_in_memory() {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::ConnectionFailed(format!(
                        "Failed to create {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }
    }

    let conn = Connection::open(&config.path)
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    configure_connection(&conn, config)
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    Ok(conn)
}

fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> rusqlite::Result<()> {
    if config.foreign_keys {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    }

    if let Some(timeout) = config.busy_timeout {
        conn.busy_timeout(timeout)?;
    }

    if config.wal_mode && !config.is_in_memory() {
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Journal mode: {}", mode);
    }

    Ok(())
}
