//! Account credentials for the Cognito sign-in flow.

use secrecy::{ExposeSecret, SecretString};

use crate::error::TrackerError;

/// Environment variable holding the account e-mail address.
pub const USERNAME_VAR: &str = "MAPIT_USERNAME";
/// Environment variable holding the account password.
pub const PASSWORD_VAR: &str = "MAPIT_PASSWORD";
/// Environment variable holding the Cognito identity pool id.
pub const IDENTITY_POOL_VAR: &str = "MAPIT_IDENTITY_POOL_ID";
/// Environment variable holding the Cognito user pool id.
pub const USER_POOL_VAR: &str = "MAPIT_USER_POOL_ID";
/// Environment variable holding the user pool web client id.
pub const CLIENT_ID_VAR: &str = "MAPIT_CLIENT_ID";

/// The credential set supplied once at startup.
///
/// Immutable for the lifetime of the process; every token is derived from it.
#[derive(Clone)]
pub struct Credentials {
    /// Cognito identity pool id (e.g. `eu-west-1:0000-...`)
    pub identity_pool_id: String,
    /// Cognito user pool id (e.g. `eu-west-1_AbCdEf`)
    pub user_pool_id: String,
    /// User pool web client id
    pub client_id: String,
    /// Account e-mail address, also used for the account lookup
    pub username: String,
    password: SecretString,
}

impl Credentials {
    /// Create a credential set.
    pub fn new(
        identity_pool_id: impl Into<String>,
        user_pool_id: impl Into<String>,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            identity_pool_id: identity_pool_id.into(),
            user_pool_id: user_pool_id.into(),
            client_id: client_id.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Read the credential set from the `MAPIT_*` environment variables.
    pub fn from_env() -> Result<Self, TrackerError> {
        Ok(Self::new(
            require_var(IDENTITY_POOL_VAR)?,
            require_var(USER_POOL_VAR)?,
            require_var(CLIENT_ID_VAR)?,
            require_var(USERNAME_VAR)?,
            require_var(PASSWORD_VAR)?,
        ))
    }

    /// Get the password for the sign-in call.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity_pool_id", &self.identity_pool_id)
            .field("user_pool_id", &self.user_pool_id)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn require_var(name: &str) -> Result<String, TrackerError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(TrackerError::MissingCredentials(name.to_string())),
    }
}
