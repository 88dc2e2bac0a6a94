use std::collections::HashMap;

use chrono::{Duration, Utc};
use rusqlite::{params, Connection};

/// Sliding session window: a session untouched for this long is gone.
const SESSION_TTL_MINUTES: i64 = 30;

pub fn get_session(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Option<HashMap<String, String>>> {
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut stmt =
        conn.prepare("SELECT attributes FROM sessions WHERE user_id = ?1 AND expires_at > ?2")?;

    let result = stmt.query_row(params![user_id, now], |row| row.get::<_, String>(0));

    match result {
        Ok(raw) => {
            let attributes = match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "malformed session attributes, starting fresh");
                    HashMap::new()
                }
            };
            Ok(Some(attributes))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_session(
    conn: &Connection,
    user_id: &str,
    attributes: &HashMap<String, String>,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(attributes)?;
    let now = Utc::now().naive_utc();
    let last_activity = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let expires_at = (now + Duration::minutes(SESSION_TTL_MINUTES))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    conn.execute(
        "INSERT INTO sessions (user_id, attributes, last_activity, expires_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
           attributes = excluded.attributes,
           last_activity = excluded.last_activity,
           expires_at = excluded.expires_at",
        params![user_id, raw, last_activity, expires_at],
    )?;
    Ok(())
}

pub fn expire_old_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    Ok(count)
}
