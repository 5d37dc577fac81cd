//! Polling loop.
//!
//! The [`Runner`] owns the API client, the [`Session`] and the sink. Each poll
//! authenticates when needed, fetches one reading, and on a rejected token
//! re-authenticates and retries exactly once.

mod session;

pub use session::Session;

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::TokenStore;
use crate::error::TrackerError;
use crate::rest::{Reading, VehicleApi};
use crate::sink::ReadingSink;

/// Default pause between polls in continuous mode.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

pub struct Runner<A, S, K> {
    api: A,
    session: Session<S>,
    sink: K,
    interval: Duration,
}

impl<A, S, K> Runner<A, S, K>
where
    A: VehicleApi,
    S: TokenStore,
    K: ReadingSink,
{
    pub fn new(api: A, session: Session<S>, sink: K) -> Self {
        Self {
            api,
            session,
            sink,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Set the pause between polls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Fetch one reading.
    ///
    /// Authenticates first when the session holds no bundle. A rejected
    /// bundle triggers one full re-authentication and one retry; a second
    /// [`TrackerError::Unauthorized`] is returned as is.
    pub async fn poll_once(&mut self) -> Result<Reading, TrackerError> {
        if !self.session.is_authenticated() {
            self.session.authenticate(&self.api).await?;
        }
        let bundle = self
            .session
            .bundle()
            .ok_or_else(|| TrackerError::Auth("Session holds no tokens".to_string()))?;

        let first = self.api.fetch_status(bundle).await;
        match first {
            Err(TrackerError::Unauthorized) => {
                warn!("Token expired, re-authenticating");
                self.session.invalidate();
                let bundle = self.session.authenticate(&self.api).await?;
                self.api.fetch_status(bundle).await
            }
            outcome => outcome,
        }
    }

    /// Single-shot mode: poll once, hand the reading to the sink, close it.
    ///
    /// Poll failures are returned; sink failures are only logged.
    pub async fn run_once(&mut self) -> Result<Reading, TrackerError> {
        let outcome = self.poll_once().await;
        if let Ok(reading) = &outcome {
            self.deliver(reading);
        }
        self.sink.close();
        outcome
    }

    /// Continuous mode: poll every interval until `shutdown` resolves.
    ///
    /// Shutdown is only observed between polls. Transient failures, including
    /// server or transport errors during sign-in, are logged and the loop
    /// carries on. Rejected credentials and a repeated
    /// [`TrackerError::Unauthorized`] end it.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), TrackerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval = ?self.interval, "Polling started");

        let result = loop {
            match self.poll_once().await {
                Ok(reading) => self.deliver(&reading),
                Err(e) if e.is_transient() => warn!("Poll failed: {e}"),
                Err(e) => break Err(e),
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Process interrupted, stopping");
                    break Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        self.sink.close();
        result
    }

    fn deliver(&mut self, reading: &Reading) {
        if let Err(e) = self.sink.accept(reading) {
            warn!("Reading not stored: {e}");
        }
    }
}

impl<A, S, K> std::fmt::Debug for Runner<A, S, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("session", &self.session)
            .field("interval", &self.interval)
            .finish()
    }
}
