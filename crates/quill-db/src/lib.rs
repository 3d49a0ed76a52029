//! Persistence layer for the blog API
//!
//! SeaORM entities for authors, posts, comments, tags and categories, plus
//! the embedded schema migrator. Supports SQLite (including `sqlite::memory:`
//! for tests) and PostgreSQL.

pub mod entities;
pub mod migrator;

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

pub use migrator::Migrator;

/// Connect to the database at `url`.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    info!("Connecting to database");
    Database::connect(url).await
}

/// Apply all pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running database migrations");
    Migrator::up(db, None).await
}
