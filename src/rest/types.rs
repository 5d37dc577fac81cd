//! Request and response types for the Cognito and Mapit APIs.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::error::TrackerError;

// ========== Cognito ==========

/// `InitiateAuth` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InitiateAuthRequest<'a> {
    pub auth_flow: &'a str,
    pub client_id: &'a str,
    pub auth_parameters: AuthParameters<'a>,
    pub client_metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthParameters<'a> {
    #[serde(rename = "USERNAME")]
    pub username: &'a str,
    #[serde(rename = "PASSWORD")]
    pub password: &'a str,
}

/// `InitiateAuth` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InitiateAuthResponse {
    pub authentication_result: UserPoolTokens,
}

/// Tokens issued by the user pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPoolTokens {
    pub id_token: String,
    pub access_token: String,
}

/// `GetId` / `GetCredentialsForIdentity` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct IdentityRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_pool_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<&'a str>,
    pub logins: HashMap<String, &'a str>,
}

/// `GetId` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GetIdResponse {
    pub identity_id: String,
}

/// `GetCredentialsForIdentity` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GetCredentialsResponse {
    pub credentials: TemporaryCredentials,
}

/// Temporary AWS credentials handed out by the identity pool.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_key: String,
    pub session_token: String,
    /// Expiry as epoch seconds, informational only.
    #[serde(default)]
    pub expiration: Option<f64>,
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// `GetUser` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GetUserRequest<'a> {
    pub access_token: &'a str,
}

/// User profile returned by `GetUser`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub user_attributes: Vec<UserAttribute>,
}

impl UserProfile {
    /// Look up a user attribute by name (e.g. `email`).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.user_attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

// ========== Mapit ==========

/// One entry of the `/v1/accounts` lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// `/v1/accounts/{id}/summary` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vehicle {
    pub device: Device,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub state: DeviceState,
}

/// Raw tracker state as reported upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
    pub status: MovementStatus,
    #[serde(default)]
    pub gps_accuracy: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub hdop: Option<f64>,
    #[serde(default)]
    pub odometer: Option<f64>,
    #[serde(default)]
    pub last_coord_ts: Option<i64>,
}

impl AccountSummary {
    /// Normalized reading of the first vehicle.
    pub fn first_reading(&self) -> Result<Reading, TrackerError> {
        self.vehicles
            .first()
            .map(|vehicle| Reading::from(&vehicle.device.state))
            .ok_or_else(|| TrackerError::InvalidResponse("Summary lists no vehicles".to_string()))
    }
}

/// Movement state of the vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MovementStatus {
    /// Parked; upstream speed is residual noise
    AtRest,
    /// Moving
    Moving,
    /// Any other upstream value, kept verbatim
    Other(String),
}

impl MovementStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MovementStatus::AtRest => "AT_REST",
            MovementStatus::Moving => "MOVING",
            MovementStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for MovementStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "AT_REST" => MovementStatus::AtRest,
            "MOVING" => MovementStatus::Moving,
            _ => MovementStatus::Other(raw),
        }
    }
}

impl From<MovementStatus> for String {
    fn from(status: MovementStatus) -> Self {
        match status {
            MovementStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized status reading.
///
/// Speed is always `0` while [`MovementStatus::AtRest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub longitude: f64,
    pub latitude: f64,
    /// km/h
    pub speed: f64,
    pub status: MovementStatus,
    /// Metres
    pub gps_accuracy: Option<f64>,
    /// Percent
    pub battery: Option<f64>,
    pub hdop: Option<f64>,
    pub odometer: Option<f64>,
    /// Last GPS fix in epoch milliseconds
    pub last_coord_ts: Option<i64>,
}

impl Reading {
    /// Time of the last GPS fix, when reported and representable.
    pub fn last_fix(&self) -> Option<OffsetDateTime> {
        let ms = self.last_coord_ts?;
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
    }

    /// Same (lng, lat) position as `other`.
    pub fn same_position(&self, other: &Reading) -> bool {
        self.longitude == other.longitude && self.latitude == other.latitude
    }
}

impl From<&DeviceState> for Reading {
    fn from(state: &DeviceState) -> Self {
        let speed = if state.status == MovementStatus::AtRest {
            0.0
        } else {
            state.speed
        };
        Reading {
            longitude: state.lng,
            latitude: state.lat,
            speed,
            status: state.status.clone(),
            gps_accuracy: state.gps_accuracy,
            battery: state.battery,
            hdop: state.hdop,
            odometer: state.odometer,
            last_coord_ts: state.last_coord_ts,
        }
    }
}

/// Accept an id sent either as a JSON string or a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
