//! Recording metadata per drawing surface.

pub mod recordings;
pub mod schema;

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::upload::ProcessingStatus;
use recordings::RecordingRepository;

/// One uploaded recording. Created after the host accepted the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingEntry {
    pub id: i64,
    pub scene_id: String,
    pub title: String,
    pub host_video_id: String,
    pub duration_seconds: u64,
    pub processing_status: ProcessingStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecording {
    pub title: String,
    pub host_video_id: String,
    pub duration_seconds: u64,
    pub processing_status: ProcessingStatus,
}

/// Mutations return whether a matching entry existed.
pub trait RecordingStore: Send + Sync {
    fn list(&self, scene_id: &str) -> Result<Vec<RecordingEntry>>;
    fn get(&self, scene_id: &str, id: i64) -> Result<Option<RecordingEntry>>;
    fn create(&self, scene_id: &str, recording: NewRecording) -> Result<RecordingEntry>;
    fn update_status(&self, scene_id: &str, id: i64, status: ProcessingStatus) -> Result<bool>;
    fn rename(&self, scene_id: &str, id: i64, title: &str) -> Result<bool>;
    fn delete(&self, scene_id: &str, id: i64) -> Result<bool>;
}

pub struct SqliteRecordingStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordingStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(schema::open(path)?))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&crate::global::db_file()?)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }
}

impl RecordingStore for SqliteRecordingStore {
    fn list(&self, scene_id: &str) -> Result<Vec<RecordingEntry>> {
        self.with_conn(|conn| RecordingRepository::list(conn, scene_id))
    }

    fn get(&self, scene_id: &str, id: i64) -> Result<Option<RecordingEntry>> {
        self.with_conn(|conn| RecordingRepository::get(conn, scene_id, id))
    }

    fn create(&self, scene_id: &str, recording: NewRecording) -> Result<RecordingEntry> {
        self.with_conn(|conn| {
            let id = RecordingRepository::insert(conn, scene_id, &recording)?;
            RecordingRepository::get(conn, scene_id, id)?
                .ok_or_else(|| anyhow::anyhow!("Recording {} vanished after insert", id))
        })
    }

    fn update_status(&self, scene_id: &str, id: i64, status: ProcessingStatus) -> Result<bool> {
        self.with_conn(|conn| RecordingRepository::update_status(conn, scene_id, id, status))
    }

    fn rename(&self, scene_id: &str, id: i64, title: &str) -> Result<bool> {
        self.with_conn(|conn| RecordingRepository::rename(conn, scene_id, id, title))
    }

    fn delete(&self, scene_id: &str, id: i64) -> Result<bool> {
        self.with_conn(|conn| RecordingRepository::delete(conn, scene_id, id))
    }
}
