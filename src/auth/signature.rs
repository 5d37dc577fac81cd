//! AWS Signature Version 4 for the vendor status API.
//!
//! Every authorized call is a bodyless GET signed as:
//! ```text
//! kSigning  = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")
//! signature = hex(HMAC(kSigning, string_to_sign))
//! ```
//!
//! The canonical request covers exactly three headers, `accept`, `host` and
//! `x-amz-date`, in that order. The verifier rejects anything else.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use crate::error::TrackerError;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Header names covered by the signature, lowercase and sorted.
pub const SIGNED_HEADERS: &str = "accept;host;x-amz-date";

/// The `Accept` header value sent with (and signed into) every request.
pub const ACCEPT_JSON: &str = "application/json";

/// SHA-256 of the empty body.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Region and service the signing key is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

/// The request fields that go into the canonical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    /// HTTP method, uppercase
    pub method: &'a str,
    /// Absolute path, already URI-encoded
    pub path: &'a str,
    /// Canonical query string without the leading `?` (may be empty)
    pub query: &'a str,
    /// Value of the `host` header, including a non-default port
    pub host: &'a str,
}

impl CanonicalRequest<'_> {
    /// Render the canonical request string for the given `x-amz-date` value.
    pub fn to_canonical_string(&self, amz_date: &str) -> String {
        format!(
            "{method}\n{path}\n{query}\naccept:{ACCEPT_JSON}\nhost:{host}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{EMPTY_PAYLOAD_SHA256}",
            method = self.method,
            path = self.path,
            query = self.query,
            host = self.host,
        )
    }
}

/// Output of [`sign_request`]: the values that must travel with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    /// `x-amz-date` header value (`YYYYMMDDTHHMMSSZ`)
    pub amz_date: String,
    /// Hex-encoded signature
    pub signature: String,
    /// Full `Authorization` header value
    pub authorization: String,
}

/// Sign a bodyless request.
///
/// # Arguments
///
/// * `access_key` - Temporary access key id, placed in the credential scope
/// * `secret_key` - Temporary secret key used to derive the signing key
/// * `scope` - Region and service
/// * `request` - Canonical request fields
/// * `timestamp` - Signing time; converted to UTC
///
/// # Example
///
/// ```rust
/// use mapit_tracker::auth::{CanonicalRequest, SigningScope, sign_request};
/// use time::macros::datetime;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let signed = sign_request(
///     "ASIAEXAMPLE",
///     "secret",
///     &SigningScope { region: "eu-west-1", service: "execute-api" },
///     &CanonicalRequest {
///         method: "GET",
///         path: "/v1/accounts",
///         query: "email=rider%40example.com",
///         host: "core.prod.mapit.me",
///     },
///     datetime!(2024-05-01 12:00 UTC),
/// )?;
/// assert_eq!(signed.amz_date, "20240501T120000Z");
/// # Ok(())
/// # }
/// ```
pub fn sign_request(
    access_key: &str,
    secret_key: &str,
    scope: &SigningScope<'_>,
    request: &CanonicalRequest<'_>,
    timestamp: OffsetDateTime,
) -> Result<RequestSignature, TrackerError> {
    let utc = timestamp.to_offset(UtcOffset::UTC);
    let amz_date = utc
        .format(format_description!("[year][month][day]T[hour][minute][second]Z"))
        .map_err(|e| TrackerError::Auth(format!("Failed to format signing time: {e}")))?;
    let date_stamp = &amz_date[..8];

    let credential_scope = format!(
        "{date_stamp}/{}/{}/aws4_request",
        scope.region, scope.service
    );
    let canonical = request.to_canonical_string(&amz_date);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let key = signing_key(secret_key, date_stamp, scope)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);
    let authorization = format!(
        "{ALGORITHM} Credential={access_key}/{credential_scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}"
    );

    Ok(RequestSignature {
        amz_date,
        signature,
        authorization,
    })
}

/// Derive the per-day signing key.
pub fn signing_key(
    secret_key: &str,
    date_stamp: &str,
    scope: &SigningScope<'_>,
) -> Result<Vec<u8>, TrackerError> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, scope.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, scope.service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, TrackerError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TrackerError::Auth(format!("Invalid HMAC key: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
