//! # Mapit Tracker
//!
//! A client for the Mapit vehicle-tracking cloud API.
//!
//! ## Features
//!
//! - Cognito user pool + identity pool sign-in, cached across restarts
//! - AWS Signature V4 signed status requests
//! - Typed, normalized status readings (speed is zero while parked)
//! - One reactive re-authentication when tokens are rejected
//! - Reading sinks: log, SQLite, JSON-lines documents, latest-value handle
//! - GeoJSON export of recorded history
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapit_tracker::auth::Credentials;
//! use mapit_tracker::cache::FileTokenStore;
//! use mapit_tracker::rest::MapitClient;
//! use mapit_tracker::runner::{Runner, Session};
//! use mapit_tracker::sink::LogSink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MapitClient::builder().build()?;
//!     let session = Session::restore(Credentials::from_env()?, FileTokenStore::new("tokens.json"));
//!     let mut runner = Runner::new(client, session, LogSink::new());
//!
//!     let reading = runner.run_once().await?;
//!     println!("{} at {} km/h", reading.status, reading.speed);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod rest;
pub mod runner;
pub mod sink;

// Re-export commonly used types at crate root
pub use error::TrackerError;
pub use rest::{MovementStatus, Reading};

/// Result type alias using TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;
