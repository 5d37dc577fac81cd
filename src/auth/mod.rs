//! Authentication primitives for the Mapit API.
//!
//! This module provides:
//! - Credential management with secure password storage
//! - The token bundle produced by the Cognito sign-in sequence
//! - AWS Signature V4 generation for authorized requests

mod credentials;
mod signature;
mod tokens;

pub use credentials::{
    CLIENT_ID_VAR, Credentials, IDENTITY_POOL_VAR, PASSWORD_VAR, USER_POOL_VAR, USERNAME_VAR,
};
pub use signature::{
    ACCEPT_JSON, ALGORITHM, CanonicalRequest, EMPTY_PAYLOAD_SHA256, RequestSignature,
    SIGNED_HEADERS, SigningScope, sign_request, signing_key,
};
pub use tokens::TokenBundle;

#[cfg(test)]
pub(crate) use tokens::sample_bundle;
