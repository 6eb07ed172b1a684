use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(db_path).context("Failed to open database connection")?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS recordings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scene_id TEXT NOT NULL,
            title TEXT NOT NULL,
            host_video_id TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL DEFAULT 0,
            processing_status TEXT NOT NULL DEFAULT 'processing',
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create recordings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recordings_scene_id ON recordings(scene_id)",
        [],
    )
    .context("Failed to create recordings scene_id index")?;

    Ok(())
}
