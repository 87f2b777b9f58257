// src/common/migrations.rs
//! Database schema management for the SQLite backend

use sqlx::SqlitePool;
use tracing::info;

/// Create the schema if it does not exist yet and drop any sessions that
/// expired while the server was down.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_identity_tables(pool).await?;
    create_session_tables(pool).await?;
    purge_expired_sessions(pool).await?;

    info!("Database migration completed");
    Ok(())
}

/// One row per external Google account. `subject_id` is the stable
/// provider-assigned identifier and the only uniqueness key; the upsert
/// in the credential store relies on this constraint.
async fn create_identity_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS identities (
            subject_id TEXT PRIMARY KEY,
            display_name TEXT,
            email TEXT,
            profile_picture_url TEXT,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            token_expiry_ts INTEGER NOT NULL,
            granted_scopes TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_identities_email ON identities(email)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Server-side sessions keyed by the opaque cookie token. The identity
/// snapshot is stored as JSON, the way connect-pg-simple keeps its `sess`
/// column in the original deployment.
async fn create_session_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_json TEXT,
            message TEXT,
            expires_at_ts INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at_ts)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn purge_expired_sessions(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let purged = sqlx::query("DELETE FROM sessions WHERE expires_at_ts <= strftime('%s','now')")
        .execute(pool)
        .await?;

    if purged.rows_affected() > 0 {
        info!(count = purged.rows_affected(), "Purged expired sessions");
    }

    Ok(())
}
