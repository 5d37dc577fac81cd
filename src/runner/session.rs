//! Explicit authentication session owned by the runner.

use tracing::{debug, info};

use crate::auth::{Credentials, TokenBundle};
use crate::cache::TokenStore;
use crate::error::TrackerError;
use crate::rest::VehicleApi;

/// Credentials, the current token bundle, and where the bundle is mirrored.
///
/// UNAUTHENTICATED while `bundle()` is `None`, AUTHENTICATED otherwise. Tokens
/// never expire on a timer; [`Session::invalidate`] is called when the API
/// rejects them.
pub struct Session<S> {
    credentials: Credentials,
    store: S,
    bundle: Option<TokenBundle>,
}

impl<S: TokenStore> Session<S> {
    /// Start a session, reusing a cached bundle when the store has one.
    pub fn restore(credentials: Credentials, store: S) -> Self {
        let bundle = store.load();
        if let Some(bundle) = &bundle {
            debug!(account_id = %bundle.account_id, "Reusing cached tokens");
        }
        Self {
            credentials,
            store,
            bundle,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bundle(&self) -> Option<&TokenBundle> {
        self.bundle.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.bundle.is_some()
    }

    /// Drop the current bundle. The stored copy is left to be overwritten.
    pub fn invalidate(&mut self) {
        if self.bundle.take().is_some() {
            debug!("Session invalidated");
        }
    }

    /// Run the sign-in sequence and adopt the resulting bundle.
    ///
    /// A rejected sign-in (any 4xx, including 401/403) is reported as
    /// [`TrackerError::Auth`]. Server and transport failures keep their own
    /// variant so a polling loop can ride them out. Either way the session
    /// is left UNAUTHENTICATED and nothing is saved.
    pub async fn authenticate<A: VehicleApi>(
        &mut self,
        api: &A,
    ) -> Result<&TokenBundle, TrackerError> {
        self.bundle = None;
        let bundle = api
            .authenticate(&self.credentials)
            .await
            .map_err(classify_sign_in_error)?;
        if !bundle.is_complete() {
            return Err(TrackerError::Auth(
                "Sign-in produced an incomplete token bundle".to_string(),
            ));
        }
        self.store.save(&bundle);
        info!(account_id = %bundle.account_id, "Session authenticated");
        Ok(self.bundle.insert(bundle))
    }
}

/// Separate credential rejections from failures worth retrying later.
fn classify_sign_in_error(error: TrackerError) -> TrackerError {
    match error {
        TrackerError::Unauthorized => {
            TrackerError::Auth(format!("Sign-in rejected: {}", TrackerError::Unauthorized))
        }
        TrackerError::RequestFailed { status, .. } if (400..500).contains(&status) => {
            TrackerError::Auth(format!("Sign-in rejected: {error}"))
        }
        other => other,
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.credentials.username)
            .field("authenticated", &self.bundle.is_some())
            .finish()
    }
}
