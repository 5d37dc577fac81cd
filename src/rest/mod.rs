//! Mapit REST API client.
//!
//! Covers the Cognito sign-in sequence and the SigV4-signed status API.
//!
//! # Trait-based API
//!
//! The [`VehicleApi`] trait abstracts the two operations the runner needs,
//! enabling scripted implementations for testing.

mod client;
pub mod endpoints;
mod traits;
mod types;

pub use client::{DEFAULT_TIMEOUT, MapitClient, MapitClientBuilder};
pub use traits::VehicleApi;
pub use types::{
    Account, AccountSummary, Device, DeviceState, MovementStatus, Reading, TemporaryCredentials,
    UserAttribute, UserPoolTokens, UserProfile, Vehicle,
};
