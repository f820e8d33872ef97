use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;

use crate::data::models::StoreError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const CORE_MIGRATION: &str = include_str!("../migrations/2025-06-01-000000_create_core/up.sql");

/// Applied to every connection handed out by the pool.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn build_pool(database_url: &str, max_size: u32) -> Result<DbPool, StoreError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)?;
    Ok(pool)
}

/// Creates the schema if it is not there yet. Every statement is `IF NOT EXISTS`.
pub fn run_migrations(pool: &DbPool) -> Result<(), StoreError> {
    let mut conn = pool.get()?;
    conn.batch_execute(CORE_MIGRATION)?;
    Ok(())
}

/// Single-connection pool over a private in-memory database.
#[cfg(test)]
pub fn test_pool() -> DbPool {
    let pool = build_pool(":memory:", 1).expect("in-memory pool");
    run_migrations(&pool).expect("schema");
    pool
}
