use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("lessonplan.sqlite3");
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fields(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn field_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM fields WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn field_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO fields(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, value, now_iso()),
    )?;
    Ok(())
}

/// All stored (key, value) pairs under the given prefix, key-ordered.
pub fn fields_all(conn: &Connection, prefix: &str) -> anyhow::Result<Vec<(String, String)>> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM fields WHERE key LIKE ? || '%' ORDER BY key")?;
    let rows = stmt
        .query_map([prefix], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete every key under the prefix except the ones listed. Returns rows removed.
pub fn fields_clear(conn: &Connection, prefix: &str, keep: &[&str]) -> anyhow::Result<usize> {
    let mut removed = 0usize;
    for (key, _) in fields_all(conn, prefix)? {
        if keep.contains(&key.as_str()) {
            continue;
        }
        removed += conn.execute("DELETE FROM fields WHERE key = ?", [key.as_str()])?;
    }
    Ok(removed)
}
