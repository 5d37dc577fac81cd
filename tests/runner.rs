use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mapit_tracker::auth::{Credentials, TokenBundle};
use mapit_tracker::cache::{MemoryTokenStore, TokenStore};
use mapit_tracker::rest::VehicleApi;
use mapit_tracker::runner::{Runner, Session};
use mapit_tracker::sink::ReadingSink;
use mapit_tracker::{MovementStatus, Reading, TrackerError};

/// Vehicle API that replays queued poll outcomes.
#[derive(Clone, Default)]
struct ScriptedApi {
    polls: Arc<Mutex<VecDeque<Result<Reading, TrackerError>>>>,
    sign_in_errors: Arc<Mutex<VecDeque<TrackerError>>>,
    authentications: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    failing_auth: bool,
}

impl ScriptedApi {
    fn with_polls(polls: Vec<Result<Reading, TrackerError>>) -> Self {
        Self {
            polls: Arc::new(Mutex::new(polls.into())),
            ..Self::default()
        }
    }

    /// Fail the next sign-ins with these errors, in order.
    fn with_sign_in_errors(self, errors: Vec<TrackerError>) -> Self {
        *self.sign_in_errors.lock().unwrap() = errors.into();
        self
    }

    fn failing_auth() -> Self {
        Self {
            failing_auth: true,
            ..Self::default()
        }
    }

    fn authentications(&self) -> usize {
        self.authentications.load(Ordering::SeqCst)
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl VehicleApi for ScriptedApi {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<TokenBundle, TrackerError> {
        let n = self.authentications.fetch_add(1, Ordering::SeqCst);
        if self.failing_auth {
            return Err(TrackerError::RequestFailed {
                status: 400,
                body: "NotAuthorizedException".to_string(),
            });
        }
        if let Some(error) = self.sign_in_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(bundle(&format!("fresh-{n}")))
    }

    async fn fetch_status(&self, _bundle: &TokenBundle) -> Result<Reading, TrackerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(reading(0.0, 0.0)))
    }
}

/// Sink that records what it was given and whether it was closed.
#[derive(Clone, Default)]
struct RecordingSink {
    readings: Arc<Mutex<Vec<Reading>>>,
    closed: Arc<AtomicUsize>,
}

impl ReadingSink for RecordingSink {
    fn accept(&mut self, reading: &Reading) -> Result<(), TrackerError> {
        self.readings.lock().unwrap().push(reading.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct FailingSink;

impl ReadingSink for FailingSink {
    fn accept(&mut self, _reading: &Reading) -> Result<(), TrackerError> {
        Err(TrackerError::StorageUnavailable("disk full".to_string()))
    }
}

fn credentials() -> Credentials {
    Credentials::new("pool", "users", "client", "driver@example.com", "hunter2")
}

fn bundle(id_token: &str) -> TokenBundle {
    TokenBundle {
        access_key: "ASIAEXAMPLE".to_string(),
        secret_key: "secret".to_string(),
        session_token: "session".to_string(),
        identity_id: "identity".to_string(),
        id_token: id_token.to_string(),
        access_token: "access".to_string(),
        account_id: "4242".to_string(),
    }
}

fn reading(lat: f64, lng: f64) -> Reading {
    Reading {
        longitude: lng,
        latitude: lat,
        speed: 0.0,
        status: MovementStatus::AtRest,
        gps_accuracy: None,
        battery: None,
        hdop: None,
        odometer: None,
        last_coord_ts: None,
    }
}

fn unavailable() -> TrackerError {
    TrackerError::RequestFailed {
        status: 503,
        body: "ServiceUnavailable".to_string(),
    }
}

fn server_error() -> TrackerError {
    TrackerError::RequestFailed {
        status: 502,
        body: "bad gateway".to_string(),
    }
}

#[tokio::test]
async fn test_fresh_session_authenticates_and_saves() {
    let api = ScriptedApi::with_polls(vec![Ok(reading(52.1, 4.3))]);
    let store = MemoryTokenStore::new();
    let session = Session::restore(credentials(), store.clone());
    assert!(!session.is_authenticated());

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let polled = runner.poll_once().await.unwrap();

    assert_eq!(polled, reading(52.1, 4.3));
    assert_eq!(api.authentications(), 1);
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.load(), Some(bundle("fresh-0")));
}

#[tokio::test]
async fn test_cached_bundle_skips_sign_in() {
    let api = ScriptedApi::with_polls(vec![Ok(reading(1.0, 2.0))]);
    let store = MemoryTokenStore::with_bundle(bundle("cached"));
    let session = Session::restore(credentials(), store.clone());
    assert!(session.is_authenticated());

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    runner.poll_once().await.unwrap();

    assert_eq!(api.authentications(), 0);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_rejected_bundle_reauthenticates_once() {
    let api = ScriptedApi::with_polls(vec![Err(TrackerError::Unauthorized), Ok(reading(3.0, 4.0))]);
    let store = MemoryTokenStore::with_bundle(bundle("stale"));
    let session = Session::restore(credentials(), store.clone());

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let polled = runner.poll_once().await.unwrap();

    assert_eq!(polled, reading(3.0, 4.0));
    assert_eq!(api.authentications(), 1);
    assert_eq!(api.fetches(), 2);
    assert_eq!(store.load(), Some(bundle("fresh-0")));
    assert_eq!(runner.session().bundle(), Some(&bundle("fresh-0")));
}

#[tokio::test]
async fn test_second_rejection_is_returned() {
    let api = ScriptedApi::with_polls(vec![
        Err(TrackerError::Unauthorized),
        Err(TrackerError::Unauthorized),
        Ok(reading(5.0, 6.0)),
    ]);
    let session = Session::restore(credentials(), MemoryTokenStore::with_bundle(bundle("stale")));

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let err = runner.poll_once().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(api.authentications(), 1);
    assert_eq!(api.fetches(), 2);
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let api = ScriptedApi::with_polls(vec![Err(server_error())]);
    let session = Session::restore(credentials(), MemoryTokenStore::with_bundle(bundle("cached")));

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let err = runner.poll_once().await.unwrap_err();

    assert!(matches!(err, TrackerError::RequestFailed { status: 502, .. }));
    assert_eq!(api.authentications(), 0);
    assert_eq!(api.fetches(), 1);
}

#[tokio::test]
async fn test_failed_sign_in_leaves_store_untouched() {
    let api = ScriptedApi::failing_auth();
    let store = MemoryTokenStore::new();
    let session = Session::restore(credentials(), store.clone());

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let err = runner.poll_once().await.unwrap_err();

    assert!(matches!(&err, TrackerError::Auth(msg) if msg.contains("NotAuthorizedException")));
    assert!(!runner.session().is_authenticated());
    assert_eq!(store.save_count(), 0);
    assert_eq!(api.fetches(), 0);
}

#[tokio::test]
async fn test_unavailable_sign_in_keeps_its_status() {
    let api = ScriptedApi::default().with_sign_in_errors(vec![unavailable()]);
    let store = MemoryTokenStore::new();
    let session = Session::restore(credentials(), store.clone());

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let err = runner.poll_once().await.unwrap_err();

    assert!(matches!(err, TrackerError::RequestFailed { status: 503, .. }));
    assert!(err.is_transient());
    assert!(!runner.session().is_authenticated());
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_run_once_delivers_and_closes() {
    let api = ScriptedApi::with_polls(vec![Ok(reading(7.0, 8.0))]);
    let session = Session::restore(credentials(), MemoryTokenStore::with_bundle(bundle("cached")));
    let sink = RecordingSink::default();

    let mut runner = Runner::new(api, session, sink.clone());
    runner.run_once().await.unwrap();

    assert_eq!(*sink.readings.lock().unwrap(), vec![reading(7.0, 8.0)]);
    assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_once_ignores_sink_failure() {
    let api = ScriptedApi::with_polls(vec![Ok(reading(7.0, 8.0))]);
    let session = Session::restore(credentials(), MemoryTokenStore::with_bundle(bundle("cached")));

    let mut runner = Runner::new(api, session, FailingSink);
    let polled = runner.run_once().await.unwrap();

    assert_eq!(polled, reading(7.0, 8.0));
}

#[tokio::test(start_paused = true)]
async fn test_run_continues_past_transient_errors() {
    let api = ScriptedApi::with_polls(vec![
        Ok(reading(1.0, 1.0)),
        Err(server_error()),
        Ok(reading(2.0, 2.0)),
    ]);
    let session = Session::restore(credentials(), MemoryTokenStore::with_bundle(bundle("cached")));
    let sink = RecordingSink::default();

    let mut runner = Runner::new(api.clone(), session, sink.clone())
        .with_interval(Duration::from_secs(5));
    let shutdown = tokio::time::sleep(Duration::from_secs(12));
    runner.run(shutdown).await.unwrap();

    // Polls at t=0, 5 and 10; shutdown at 12 is seen while sleeping.
    assert_eq!(api.fetches(), 3);
    assert_eq!(
        *sink.readings.lock().unwrap(),
        vec![reading(1.0, 1.0), reading(2.0, 2.0)]
    );
    assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_recovers_when_reauthentication_is_unavailable() {
    let api = ScriptedApi::with_polls(vec![Err(TrackerError::Unauthorized), Ok(reading(3.0, 4.0))])
        .with_sign_in_errors(vec![unavailable()]);
    let store = MemoryTokenStore::with_bundle(bundle("stale"));
    let session = Session::restore(credentials(), store.clone());
    let sink = RecordingSink::default();

    let mut runner = Runner::new(api.clone(), session, sink.clone())
        .with_interval(Duration::from_secs(5));
    let shutdown = tokio::time::sleep(Duration::from_secs(12));
    runner.run(shutdown).await.unwrap();

    // t=0: rejected, re-auth gets 503. t=5: signs in and polls. t=10: polls.
    assert_eq!(api.authentications(), 2);
    assert_eq!(api.fetches(), 3);
    assert_eq!(
        *sink.readings.lock().unwrap(),
        vec![reading(3.0, 4.0), reading(0.0, 0.0)]
    );
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.load(), Some(bundle("fresh-1")));
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_on_failed_sign_in() {
    let api = ScriptedApi::failing_auth();
    let session = Session::restore(credentials(), MemoryTokenStore::new());
    let sink = RecordingSink::default();

    let mut runner = Runner::new(api.clone(), session, sink.clone());
    let err = runner.run(std::future::pending::<()>()).await.unwrap_err();

    assert!(matches!(err, TrackerError::Auth(_)));
    assert_eq!(api.authentications(), 1);
    assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_after_repeated_rejection() {
    let api = ScriptedApi::with_polls(vec![
        Err(TrackerError::Unauthorized),
        Err(TrackerError::Unauthorized),
    ]);
    let session = Session::restore(credentials(), MemoryTokenStore::with_bundle(bundle("stale")));

    let mut runner = Runner::new(api.clone(), session, RecordingSink::default());
    let err = runner.run(std::future::pending::<()>()).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(api.fetches(), 2);
}
