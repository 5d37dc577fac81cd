//! JSON-lines document log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::TrackerError;
use crate::rest::Reading;
use crate::sink::ReadingSink;

/// Appends one JSON document per reading, stamped with a wall-clock
/// `datetime` field (`YYYY-MM-DD HH:MM:SS`, UTC).
#[derive(Debug, Clone)]
pub struct DocumentSink {
    path: PathBuf,
}

impl DocumentSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(reading: &Reading, at: OffsetDateTime) -> Result<serde_json::Value, TrackerError> {
        let mut document = serde_json::to_value(reading)?;
        let datetime = at
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
            .map_err(|e| TrackerError::StorageUnavailable(format!("timestamp: {e}")))?;
        if let Some(fields) = document.as_object_mut() {
            fields.insert("datetime".to_string(), serde_json::Value::String(datetime));
        }
        Ok(document)
    }
}

impl ReadingSink for DocumentSink {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        let mut line = serde_json::to_vec(&Self::document(reading, OffsetDateTime::now_utc())?)?;
        line.push(b'\n');

        let unavailable =
            |e: std::io::Error| TrackerError::StorageUnavailable(format!("{}: {e}", self.path.display()));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(unavailable)?;
        file.write_all(&line).map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::sample_reading;
    use time::macros::datetime;

    #[test]
    fn test_document_carries_wall_clock() {
        let doc = DocumentSink::document(&sample_reading(4.3, 52.1), datetime!(2024-05-01 08:03:09 UTC))
            .unwrap();
        assert_eq!(doc["datetime"], "2024-05-01 08:03:09");
        assert_eq!(doc["longitude"], 4.3);
        assert_eq!(doc["status"], "MOVING");
    }

    #[test]
    fn test_appends_one_line_per_reading() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DocumentSink::new(dir.path().join("readings.jsonl"));
        sink.accept(&sample_reading(1.0, 2.0)).unwrap();
        sink.accept(&sample_reading(3.0, 4.0)).unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["latitude"], 4.0);
    }

    #[test]
    fn test_missing_directory_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DocumentSink::new(dir.path().join("missing/readings.jsonl"));
        assert!(matches!(
            sink.accept(&sample_reading(1.0, 2.0)),
            Err(TrackerError::StorageUnavailable(_))
        ));
    }
}
