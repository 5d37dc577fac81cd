use tracing::{debug, info};

use crate::error::TrackerError;
use crate::rest::Reading;
use crate::sink::ReadingSink;

/// Forwards a reading only when the position moved since the last one stored.
#[derive(Debug)]
pub struct OnPositionChange<S> {
    inner: S,
    last: Option<Reading>,
}

impl<S: ReadingSink> OnPositionChange<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, last: None }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ReadingSink> ReadingSink for OnPositionChange<S> {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        if let Some(last) = &self.last {
            if last.same_position(reading) {
                debug!("Position unchanged, skipping");
                return Ok(());
            }
            info!(
                lng = reading.longitude,
                lat = reading.latitude,
                speed = reading.speed,
                was_lng = last.longitude,
                was_lat = last.latitude,
                "Vehicle moved"
            );
        }
        // Only remember positions that were actually stored.
        self.inner.accept(reading)?;
        self.last = Some(reading.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::sample_reading;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Reading>,
        fail_next: bool,
    }

    impl ReadingSink for Recorder {
        fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
            if std::mem::take(&mut self.fail_next) {
                return Err(TrackerError::StorageUnavailable("down".into()));
            }
            self.seen.push(reading.clone());
            Ok(())
        }
    }

    #[test]
    fn test_repeated_position_is_suppressed() {
        let mut sink = OnPositionChange::new(Recorder::default());
        sink.accept(&sample_reading(4.3, 52.1)).unwrap();
        sink.accept(&sample_reading(4.3, 52.1)).unwrap();
        sink.accept(&sample_reading(4.4, 52.1)).unwrap();
        sink.accept(&sample_reading(4.4, 52.1)).unwrap();
        assert_eq!(sink.inner().seen.len(), 2);
    }

    #[test]
    fn test_failed_store_is_retried_on_next_reading() {
        let mut sink = OnPositionChange::new(Recorder {
            fail_next: true,
            ..Default::default()
        });
        assert!(sink.accept(&sample_reading(4.3, 52.1)).is_err());
        sink.accept(&sample_reading(4.3, 52.1)).unwrap();
        assert_eq!(sink.inner().seen.len(), 1);
    }
}
