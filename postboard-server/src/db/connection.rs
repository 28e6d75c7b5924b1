use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema::{ensure_fallback_author, SCHEMA};

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling support
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `path` - Database file path or ":memory:" for in-memory database
    ///
    /// An in-memory database is private to a single SQLite connection, so its
    /// pool is capped at one connection and every caller sees the same data.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let in_memory = path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH);

        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

        let mut builder = Pool::builder();
        if in_memory {
            // Recycling the only connection would discard the database
            builder = builder.max_size(1).idle_timeout(None).max_lifetime(None);
        }
        let pool = builder
            .build(manager)
            .context("Failed to create database connection pool")?;

        Ok(Self { pool })
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    /// Initialize the database schema and seed the fallback author
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;

        if ensure_fallback_author(&conn)? {
            tracing::info!("Seeded fallback author");
        }

        Ok(())
    }

    /// Get a connection from the pool
    pub fn connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get database connection from pool")
    }
}
