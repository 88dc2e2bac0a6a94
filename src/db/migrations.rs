use anyhow::Context;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            user_id TEXT PRIMARY KEY,
            attributes TEXT NOT NULL,
            last_activity TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );",
    )
    .context("failed to create sessions table")?;

    Ok(())
}
