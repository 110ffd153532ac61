use crate::state::SnapshotStore;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "pollroom.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots(
            slot TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn load_slot(conn: &Connection, slot: &str) -> anyhow::Result<Option<String>> {
    let body = conn
        .query_row("SELECT body FROM snapshots WHERE slot = ?", [slot], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(body)
}

pub fn save_slot(conn: &Connection, slot: &str, body: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO snapshots(slot, body, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(slot) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        (slot, body, Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

/// Production snapshot port: one JSON document per slot in the
/// workspace database.
pub struct SqliteSnapshots {
    conn: Connection,
}

impl SqliteSnapshots {
    pub fn new(conn: Connection) -> Self {
        SqliteSnapshots { conn }
    }
}

impl SnapshotStore for SqliteSnapshots {
    fn load(&self, slot: &str) -> anyhow::Result<Option<String>> {
        load_slot(&self.conn, slot)
    }

    fn save(&mut self, slot: &str, body: &str) -> anyhow::Result<()> {
        save_slot(&self.conn, slot, body)
    }
}
