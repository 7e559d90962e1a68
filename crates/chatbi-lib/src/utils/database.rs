// SQLite Database Connection Management
// Provides thread-safe database access for the library and the MCP server

use rusqlite::{Connection, Result as SqliteResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::config::get_app_data_dir;
use super::schema;

/// Database file name
#[cfg(debug_assertions)]
pub const DATABASE_FILE: &str = "chatbi-dev.db";

#[cfg(not(debug_assertions))]
pub const DATABASE_FILE: &str = "chatbi.db";

/// Thread-safe database wrapper
/// Uses Arc<Mutex<Connection>> for concurrent access from multiple threads
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Create a new database connection
    /// Automatically enables WAL mode and runs migrations
    pub fn new(path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create database directory: {}", e))?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| format!("Failed to open database: {}", e))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=5000;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            "#,
        )
        .map_err(|e| format!("Failed to configure database: {}", e))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Create a migrated in-memory database (tests and ephemeral sessions)
    pub fn new_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to open in-memory database: {}", e))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Get database file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Get a lock on the connection for executing queries
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, String> {
        self.conn
            .lock()
            .map_err(|e| format!("Failed to acquire database lock: {}", e))
    }

    fn run_migrations(&self) -> Result<(), String> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    /// Execute a function with the database connection
    /// The closure should return Result<T, String> with errors already converted
    pub fn with_connection<T, F>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&Connection) -> Result<T, String>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a function with the database connection (raw SQLite result)
    pub fn with_connection_raw<T, F>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.lock()?;
        f(&conn).map_err(|e| format!("Database error: {}", e))
    }

    /// Execute a function with a transaction
    /// Automatically commits on success, rolls back on error
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&Connection) -> Result<T, String>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| format!("Failed to start transaction: {}", e))?;

        match f(&tx) {
            Ok(result) => {
                tx.commit()
                    .map_err(|e| format!("Failed to commit transaction: {}", e))?;
                Ok(result)
            }
            // Dropping the transaction rolls it back
            Err(e) => Err(e),
        }
    }

    /// Get the current schema version
    pub fn schema_version(&self) -> Result<i32, String> {
        self.with_connection(|conn| schema::get_version(conn))
            .or_else(|_| Ok(0))
    }
}

/// Get the default database path
pub fn get_database_path() -> Result<PathBuf, String> {
    Ok(get_app_data_dir()?.join(DATABASE_FILE))
}

/// Open the database at the configured path, or the default location
pub fn open_database(path: Option<PathBuf>) -> Result<Database, String> {
    let path = match path {
        Some(path) => path,
        None => get_database_path()?,
    };
    log::info!("[database] Opening {}", path.display());
    Database::new(path)
}
