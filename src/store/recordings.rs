//! Recording entry persistence.
//!
//! CRUD for the `recordings` table, raw SQL with rusqlite. Every query is
//! scoped by scene so one drawing surface never sees another's entries.

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::{NewRecording, RecordingEntry};
use crate::upload::ProcessingStatus;

const SELECT_COLUMNS: &str = "SELECT id, scene_id, title, host_video_id, duration_seconds, \
                              processing_status, created_at FROM recordings";

pub struct RecordingRepository;

impl RecordingRepository {
    pub fn insert(conn: &Connection, scene_id: &str, recording: &NewRecording) -> Result<i64> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        conn.execute(
            "INSERT INTO recordings (scene_id, title, host_video_id, duration_seconds, \
             processing_status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                scene_id,
                recording.title,
                recording.host_video_id,
                recording.duration_seconds as i64,
                recording.processing_status.as_str(),
                created_at,
            ],
        )
        .context("Failed to insert recording")?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get(conn: &Connection, scene_id: &str, id: i64) -> Result<Option<RecordingEntry>> {
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE scene_id = ?1 AND id = ?2"))
            .context("Failed to prepare recording query")?;

        let mut rows = stmt
            .query_map(params![scene_id, id], map_row)
            .context("Failed to query recording")?;

        match rows.next() {
            Some(row) => Ok(Some(into_entry(row?)?)),
            None => Ok(None),
        }
    }

    /// Entries for one scene, newest first.
    pub fn list(conn: &Connection, scene_id: &str) -> Result<Vec<RecordingEntry>> {
        let mut stmt = conn
            .prepare(&format!(
                "{SELECT_COLUMNS} WHERE scene_id = ?1 ORDER BY created_at DESC, id DESC"
            ))
            .context("Failed to prepare recordings list query")?;

        let rows = stmt
            .query_map(params![scene_id], map_row)
            .context("Failed to list recordings")?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(into_entry(row?)?);
        }
        Ok(entries)
    }

    pub fn update_status(
        conn: &Connection,
        scene_id: &str,
        id: i64,
        status: ProcessingStatus,
    ) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE recordings SET processing_status = ?1 WHERE scene_id = ?2 AND id = ?3",
                params![status.as_str(), scene_id, id],
            )
            .context("Failed to update recording status")?;
        Ok(changed > 0)
    }

    pub fn rename(conn: &Connection, scene_id: &str, id: i64, title: &str) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE recordings SET title = ?1 WHERE scene_id = ?2 AND id = ?3",
                params![title, scene_id, id],
            )
            .context("Failed to rename recording")?;
        Ok(changed > 0)
    }

    pub fn delete(conn: &Connection, scene_id: &str, id: i64) -> Result<bool> {
        let changed = conn
            .execute(
                "DELETE FROM recordings WHERE scene_id = ?1 AND id = ?2",
                params![scene_id, id],
            )
            .context("Failed to delete recording")?;
        Ok(changed > 0)
    }
}

type RawRow = (i64, String, String, String, i64, String, String);

fn map_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_entry(raw: RawRow) -> Result<RecordingEntry> {
    let (id, scene_id, title, host_video_id, duration_seconds, status, created_at) = raw;
    let processing_status = ProcessingStatus::parse(&status)
        .ok_or_else(|| anyhow!("Unknown processing status '{}' on recording {}", status, id))?;

    Ok(RecordingEntry {
        id,
        scene_id,
        title,
        host_video_id,
        duration_seconds: duration_seconds.max(0) as u64,
        processing_status,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::migrate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn new_recording(title: &str, video_id: &str) -> NewRecording {
        NewRecording {
            title: title.to_string(),
            host_video_id: video_id.to_string(),
            duration_seconds: 42,
            processing_status: ProcessingStatus::Processing,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();
        let id = RecordingRepository::insert(&conn, "scene-1", &new_recording("Demo", "v1")).unwrap();
        assert!(id > 0);

        let entry = RecordingRepository::get(&conn, "scene-1", id).unwrap().unwrap();
        assert_eq!(entry.title, "Demo");
        assert_eq!(entry.host_video_id, "v1");
        assert_eq!(entry.duration_seconds, 42);
        assert_eq!(entry.processing_status, ProcessingStatus::Processing);
        assert!(!entry.created_at.is_empty());
    }

    #[test]
    fn test_get_is_scoped_by_scene() {
        let conn = setup_db();
        let id = RecordingRepository::insert(&conn, "scene-1", &new_recording("Demo", "v1")).unwrap();
        assert!(RecordingRepository::get(&conn, "scene-2", id).unwrap().is_none());
        assert!(!RecordingRepository::delete(&conn, "scene-2", id).unwrap());
    }

    #[test]
    fn test_list_newest_first() {
        let conn = setup_db();
        RecordingRepository::insert(&conn, "scene-1", &new_recording("First", "v1")).unwrap();
        RecordingRepository::insert(&conn, "scene-1", &new_recording("Second", "v2")).unwrap();
        RecordingRepository::insert(&conn, "scene-2", &new_recording("Other", "v3")).unwrap();

        let entries = RecordingRepository::list(&conn, "scene-1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Second");
    }

    #[test]
    fn test_update_rename_delete() {
        let conn = setup_db();
        let id = RecordingRepository::insert(&conn, "scene-1", &new_recording("Demo", "v1")).unwrap();

        assert!(RecordingRepository::update_status(&conn, "scene-1", id, ProcessingStatus::Ready).unwrap());
        assert!(RecordingRepository::rename(&conn, "scene-1", id, "Renamed").unwrap());

        let entry = RecordingRepository::get(&conn, "scene-1", id).unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Ready);
        assert_eq!(entry.title, "Renamed");

        assert!(RecordingRepository::delete(&conn, "scene-1", id).unwrap());
        assert!(RecordingRepository::list(&conn, "scene-1").unwrap().is_empty());
        assert!(!RecordingRepository::update_status(&conn, "scene-1", id, ProcessingStatus::Error).unwrap());
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let conn = setup_db();
        let id = RecordingRepository::insert(&conn, "scene-1", &new_recording("Demo", "v1")).unwrap();
        conn.execute(
            "UPDATE recordings SET processing_status = 'transcoding' WHERE id = ?1",
            params![id],
        )
        .unwrap();
        assert!(RecordingRepository::get(&conn, "scene-1", id).is_err());
    }
}
