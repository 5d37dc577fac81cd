//! Destinations for status readings.
//!
//! The runner hands every successful reading to one [`ReadingSink`]. Sink
//! failures are reported as [`TrackerError::StorageUnavailable`] and never
//! stop polling.

mod document;
mod filter;
mod latest;
mod log;
mod sqlite;

pub use document::DocumentSink;
pub use filter::OnPositionChange;
pub use latest::LatestReading;
pub use log::LogSink;
pub use sqlite::{HistoryRecord, SqliteSink};

use tracing::warn;

use crate::error::TrackerError;
use crate::rest::Reading;

/// Something that consumes readings.
pub trait ReadingSink: Send {
    /// Record one reading.
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError>;

    /// Release held resources. Called once when the runner stops.
    fn close(&mut self) {}
}

impl<S: ReadingSink + ?Sized> ReadingSink for Box<S> {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        (**self).accept(reading)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Fan-out: every sink sees every reading; the last failure is returned.
impl ReadingSink for Vec<Box<dyn ReadingSink>> {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        let mut outcome = Ok(());
        for sink in self.iter_mut() {
            if let Err(e) = sink.accept(reading) {
                warn!("Sink rejected reading: {e}");
                outcome = Err(e);
            }
        }
        outcome
    }

    fn close(&mut self) {
        for sink in self.iter_mut() {
            sink.close();
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_reading(lng: f64, lat: f64) -> Reading {
    Reading {
        longitude: lng,
        latitude: lat,
        speed: 12.5,
        status: crate::rest::MovementStatus::Moving,
        gps_accuracy: Some(5.0),
        battery: Some(91.0),
        hdop: Some(0.8),
        odometer: Some(10_500.2),
        last_coord_ts: Some(1_714_550_400_000),
    }
}
