use tracing::info;

use crate::error::TrackerError;
use crate::rest::Reading;
use crate::sink::ReadingSink;

/// Emits one structured log event per reading.
#[derive(Debug, Default)]
pub struct LogSink {
    readings: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readings logged so far.
    pub fn count(&self) -> u64 {
        self.readings
    }
}

impl ReadingSink for LogSink {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        self.readings += 1;
        info!(
            poll = self.readings,
            lng = reading.longitude,
            lat = reading.latitude,
            status = %reading.status,
            speed = reading.speed,
            battery = ?reading.battery,
            "Summary retrieved"
        );
        Ok(())
    }
}
