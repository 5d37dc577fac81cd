//! Trait definition for the vehicle API.
//!
//! [`VehicleApi`] is the seam between the runner and the network. The runner
//! only ever asks for two things: a fresh token bundle and a status reading.
//! Scripted implementations stand in for the real client in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use mapit_tracker::rest::VehicleApi;
//!
//! async fn where_is_it<A: VehicleApi>(api: &A, bundle: &TokenBundle) -> mapit_tracker::Result<()> {
//!     let reading = api.fetch_status(bundle).await?;
//!     println!("{}, {}", reading.latitude, reading.longitude);
//!     Ok(())
//! }
//! ```

use std::future::Future;

use crate::auth::{Credentials, TokenBundle};
use crate::error::TrackerError;
use crate::rest::Reading;

/// Operations the runner needs from the vendor API.
pub trait VehicleApi: Send + Sync {
    /// Run the full sign-in sequence and return a complete token bundle.
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TokenBundle, TrackerError>> + Send;

    /// Fetch and normalize the current status of the account's first vehicle.
    ///
    /// Fails with [`TrackerError::Unauthorized`] when the bundle is rejected.
    fn fetch_status(
        &self,
        bundle: &TokenBundle,
    ) -> impl Future<Output = Result<Reading, TrackerError>> + Send;
}

impl<T: VehicleApi> VehicleApi for &T {
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TokenBundle, TrackerError>> + Send {
        (**self).authenticate(credentials)
    }

    fn fetch_status(
        &self,
        bundle: &TokenBundle,
    ) -> impl Future<Output = Result<Reading, TrackerError>> + Send {
        (**self).fetch_status(bundle)
    }
}
