//! The token bundle derived by the sign-in sequence.

use serde::{Deserialize, Serialize};

/// Every short-lived credential needed to call the status API.
///
/// The serialized form is the token cache file format:
/// `access_key, secret_key, session_token, identity_id, id_token,
/// access_token, id`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    /// Temporary AWS access key id
    pub access_key: String,
    /// Temporary AWS secret key
    pub secret_key: String,
    /// Temporary AWS session token
    pub session_token: String,
    /// Federated identity id
    pub identity_id: String,
    /// User pool identity token
    pub id_token: String,
    /// User pool access token
    pub access_token: String,
    /// Vendor account id
    #[serde(rename = "id")]
    pub account_id: String,
}

impl TokenBundle {
    /// A bundle is usable only when every field is populated.
    pub fn is_complete(&self) -> bool {
        [
            &self.access_key,
            &self.secret_key,
            &self.session_token,
            &self.identity_id,
            &self.id_token,
            &self.access_token,
            &self.account_id,
        ]
        .iter()
        .all(|field| !field.is_empty())
    }
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("identity_id", &self.identity_id)
            .field("id_token", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn sample_bundle() -> TokenBundle {
    TokenBundle {
        access_key: "ASIAEXAMPLE".into(),
        secret_key: "secret".into(),
        session_token: "session".into(),
        identity_id: "eu-west-1:identity".into(),
        id_token: "id-token".into(),
        access_token: "access-token".into(),
        account_id: "42".into(),
    }
}
