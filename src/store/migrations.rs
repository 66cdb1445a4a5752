//! Version-tracked schema migrations for the card store.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//! On first run against a store written by the single-image app (`cards`
//! exists, no `_migrations` table), it seeds V1 without re-creating the table
//! and goes on to add the extra-media column. Migrations only ever add.

use libsql::Connection;

use crate::error::DatabaseError;

/// A column a migration adds, skipped when it is already there.
struct AddColumn {
    table: &'static str,
    column: &'static str,
    decl: &'static str,
}

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    add_column: Option<AddColumn>,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        add_column: None,
        sql: r#"
            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                notes TEXT,
                imageUri TEXT,
                createdAt TEXT
            );
        "#,
    },
    Migration {
        version: 2,
        name: "extra_media",
        add_column: Some(AddColumn {
            table: "cards",
            column: "extraMediaUris",
            decl: "TEXT",
        }),
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_cards_created_at ON cards(createdAt);
        "#,
    },
];

/// Highest version known to this build.
fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Run all pending migrations against the given connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let mut current_version = get_current_version(conn).await?;

    if current_version == 0 && table_exists(conn, "cards").await? {
        seed_version(conn, 1, "initial_schema").await?;
        current_version = 1;
        tracing::info!("Single-image card table detected — seeded migration V1");
    }
    if current_version > latest_version() {
        tracing::warn!(
            current_version,
            latest = latest_version(),
            "Database schema is newer than this build; leaving it as is"
        );
    }

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        if let Some(add) = &migration.add_column {
            if !column_exists(conn, add.table, add.column).await? {
                conn.execute(
                    &format!(
                        "ALTER TABLE {} ADD COLUMN {} {}",
                        add.table, add.column, add.decl
                    ),
                    (),
                )
                .await
                .map_err(|e| {
                    DatabaseError::Migration(format!(
                        "Migration V{} ({}) failed adding {}.{}: {e}",
                        migration.version, migration.name, add.table, add.column
                    ))
                })?;
            }
        }

        conn.execute_batch(migration.sql).await.map_err(|e| {
            DatabaseError::Migration(format!(
                "Migration V{} ({}) failed: {e}",
                migration.version, migration.name
            ))
        })?;
        seed_version(conn, migration.version, migration.name).await?;
    }

    let version = get_current_version(conn).await?;
    tracing::info!(version, "Database migrations complete");
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn table_exists(conn: &Connection, table: &str) -> Result<bool, DatabaseError> {
    count_is_positive(
        conn,
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        libsql::params![table],
    )
    .await
}

async fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    count_is_positive(
        conn,
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name=?2",
        libsql::params![table, column],
    )
    .await
}

async fn count_is_positive(
    conn: &Connection,
    sql: &str,
    params: impl libsql::params::IntoParams,
) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(sql, params)
        .await
        .map_err(|e| DatabaseError::Migration(format!("Schema check failed: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read schema check: {e}")))?;

    match row {
        Some(row) => {
            let count: i64 = row.get(0).unwrap_or(0);
            Ok(count > 0)
        }
        None => Ok(false),
    }
}

/// Insert a version record into `_migrations`.
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
