//! Shared handle on the most recent reading.

use std::sync::{Arc, RwLock};

use crate::error::TrackerError;
use crate::rest::Reading;
use crate::sink::ReadingSink;

/// The latest reading, readable from anywhere holding a clone.
///
/// A web endpoint or home-automation bridge keeps one clone and calls
/// [`LatestReading::get`]; the runner owns another as its sink.
#[derive(Debug, Clone, Default)]
pub struct LatestReading {
    slot: Arc<RwLock<Option<Reading>>>,
}

impl LatestReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent reading, if any arrived yet.
    pub fn get(&self) -> Option<Reading> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ReadingSink for LatestReading {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        let mut guard = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(reading.clone());
        Ok(())
    }
}
