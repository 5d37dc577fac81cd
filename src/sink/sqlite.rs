//! Relational store: one row per reading in a SQLite file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, params};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::rest::{MovementStatus, Reading};
use crate::sink::ReadingSink;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS vehicle_tracking (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    lng           REAL NOT NULL,
    lat           REAL NOT NULL,
    speed         REAL NOT NULL,
    status        TEXT NOT NULL,
    gps_accuracy  REAL,
    battery       REAL,
    hdop          REAL,
    odometer      REAL,
    last_coord_ts INTEGER,
    created_at    TEXT NOT NULL
)";

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// A stored reading with the time it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub reading: Reading,
    /// RFC 3339 insertion time
    pub recorded_at: String,
}

/// SQLite-backed reading store.
///
/// The connection is opened lazily and dropped after a failure, so an
/// unreachable database only costs the readings taken while it is down.
pub struct SqliteSink {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteSink {
    /// Create a sink for `path` without connecting yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
        }
    }

    /// Create a sink and connect immediately.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let mut sink = Self::new(path);
        sink.connection()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&mut self) -> Result<&Connection, TrackerError> {
        if self.conn.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    TrackerError::StorageUnavailable(format!("{}: {e}", parent.display()))
                })?;
            }
            let conn = Connection::open(&self.path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(SCHEMA)?;
            info!(path = %self.path.display(), "Connected to reading store");
            self.conn = Some(conn);
        }
        self.conn
            .as_ref()
            .ok_or_else(|| TrackerError::StorageUnavailable("connection unavailable".to_string()))
    }

    /// Insert one reading.
    pub fn insert(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| TrackerError::StorageUnavailable(format!("timestamp: {e}")))?;
        let result = self.connection().and_then(|conn| {
            conn.execute(
                "INSERT INTO vehicle_tracking
                    (lng, lat, speed, status, gps_accuracy, battery, hdop, odometer, last_coord_ts, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    reading.longitude,
                    reading.latitude,
                    reading.speed,
                    reading.status.as_str(),
                    reading.gps_accuracy,
                    reading.battery,
                    reading.hdop,
                    reading.odometer,
                    reading.last_coord_ts,
                    created_at,
                ],
            )
            .map_err(TrackerError::from)
        });
        if result.is_err() {
            self.conn = None;
        }
        result.map(|_| debug!("Reading stored"))
    }

    /// The newest `limit` records, newest first.
    pub fn history(&mut self, limit: usize) -> Result<Vec<HistoryRecord>, TrackerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT lng, lat, speed, status, gps_accuracy, battery, hdop, odometer, last_coord_ts, created_at
             FROM vehicle_tracking ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(HistoryRecord {
                reading: Reading {
                    longitude: row.get(0)?,
                    latitude: row.get(1)?,
                    speed: row.get(2)?,
                    status: MovementStatus::from(row.get::<_, String>(3)?),
                    gps_accuracy: row.get(4)?,
                    battery: row.get(5)?,
                    hdop: row.get(6)?,
                    odometer: row.get(7)?,
                    last_coord_ts: row.get(8)?,
                },
                recorded_at: row.get(9)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(count = records.len(), "Retrieved history");
        Ok(records)
    }
}

impl ReadingSink for SqliteSink {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        self.insert(reading)
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => debug!("Reading store closed"),
                Err((_, e)) => warn!("Failed to close reading store: {e}"),
            }
        }
    }
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink")
            .field("path", &self.path)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}
