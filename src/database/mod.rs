/// Store layer
///
/// Monitors, their append-only check history and the notification delivery
/// log live in a local libsql database behind a small trait.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{Database, LibsqlStore};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
