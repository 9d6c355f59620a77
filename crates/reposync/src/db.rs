//! Database connection helpers for the SQL record store.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

/// WAL journaling, a 5s busy timeout, and NORMAL sync for file-backed SQLite.
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

async fn open(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    if database_url.starts_with("sqlite://") {
        configure_sqlite(&db).await?;
    }
    Ok(db)
}

/// Connect without touching the schema.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    open(database_url).await
}

/// Connect and apply all pending migrations.
///
/// # Errors
/// Returns `DbErr` if the connection or a migration fails.
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = open(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    tracing::debug!("database schema is up to date");
    Ok(db)
}
