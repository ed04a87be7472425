//! Versioned schema migrations embedded from `migrations/`.
//!
//! Migrations are written schema-agnostic; [`upgrade`] and [`downgrade`] pin
//! `search_path` to the target schema, so the ledger table lives there too.

use crate::error::DbError;
use crate::session::DatabaseSessionManager;
use crate::sql::quoted;
use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::PgConnection;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Ledger table maintained by the migrator.
pub const LEDGER_TABLE: &str = "_sqlx_migrations";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub id: i64,
    pub parent: Option<i64>,
    pub description: String,
}

/// Known revisions, oldest first, each linked to the one it follows.
pub fn revisions() -> Vec<Revision> {
    let mut parent = None;
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| {
            let rev = Revision {
                id: m.version,
                parent,
                description: m.description.to_string(),
            };
            parent = Some(m.version);
            rev
        })
        .collect()
}

async fn pin_schema(conn: &mut PgConnection, schema: &str, create: bool) -> Result<(), DbError> {
    if create {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT schema_name::text FROM information_schema.schemata WHERE schema_name = $1::text")
                .bind(schema)
                .fetch_optional(&mut *conn)
                .await?;
        if exists.is_none() {
            tracing::info!(schema, "creating schema");
            sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
                .execute(&mut *conn)
                .await?;
        }
    }
    sqlx::query(&format!("SET search_path TO {}", quoted(schema)))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn unpin_schema(conn: &mut PgConnection) {
    if let Err(err) = sqlx::query("RESET search_path").execute(conn).await {
        tracing::warn!(error = %err, "could not reset search_path");
    }
}

/// Create `schema` if missing and apply every pending revision inside it.
pub async fn upgrade(manager: &DatabaseSessionManager, schema: &str) -> Result<(), DbError> {
    let pool = manager.pool()?;
    let mut conn = pool.acquire().await?;
    pin_schema(&mut conn, schema, true).await?;
    let result = MIGRATOR.run(&mut *conn).await;
    unpin_schema(&mut conn).await;
    result?;
    tracing::info!(schema, revisions = MIGRATOR.iter().count(), "migrations applied");
    Ok(())
}

/// Revert applied revisions newer than `target`. A target of 0 reverts everything.
pub async fn downgrade(manager: &DatabaseSessionManager, schema: &str, target: i64) -> Result<(), DbError> {
    let pool = manager.pool()?;
    let mut conn = pool.acquire().await?;
    pin_schema(&mut conn, schema, false).await?;
    let result = MIGRATOR.undo(&mut *conn, target).await;
    unpin_schema(&mut conn).await;
    result?;
    tracing::info!(schema, target, "migrations reverted");
    Ok(())
}

/// Delete every row from the tables of `schema`, except the ledger and `exclude`.
/// Returns the names of the cleared tables.
pub async fn clear_tables(conn: &mut PgConnection, schema: &str, exclude: &[String]) -> Result<Vec<String>, DbError> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = $1::text AND table_type = 'BASE TABLE' ORDER BY table_name",
    )
    .bind(schema)
    .fetch_all(&mut *conn)
    .await?;

    let mut cleared = Vec::new();
    for table in tables {
        if table == LEDGER_TABLE || exclude.iter().any(|e| e == &table) {
            continue;
        }
        sqlx::query(&format!("DELETE FROM {}.{}", quoted(schema), quoted(&table)))
            .execute(&mut *conn)
            .await?;
        cleared.push(table);
    }
    tracing::debug!(schema, tables = ?cleared, "tables cleared");
    Ok(cleared)
}
