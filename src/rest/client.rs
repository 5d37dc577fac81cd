//! Mapit REST client: Cognito sign-in and SigV4-signed status calls.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::{debug, info};
use url::Url;

use crate::auth::{
    ACCEPT_JSON, CanonicalRequest, Credentials, SigningScope, TokenBundle, sign_request,
};
use crate::error::{TrackerError, truncate_body};
use crate::rest::endpoints::{
    AMZ_JSON, AUTH_FLOW, MAPIT_BASE_URL, MAPIT_REGION, MAPIT_SERVICE, identity_host,
    identity_provider_host, paths, targets,
};
use crate::rest::traits::VehicleApi;
use crate::rest::types::{
    Account, AccountSummary, AuthParameters, GetCredentialsResponse, GetIdResponse,
    GetUserRequest, IdentityRequest, InitiateAuthRequest, InitiateAuthResponse, Reading,
    TemporaryCredentials, UserPoolTokens, UserProfile,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The Mapit API client.
///
/// Holds no tokens: every call takes the credentials or token bundle it
/// needs, so the caller owns the session.
///
/// # Example
///
/// ```rust,no_run
/// use mapit_tracker::auth::Credentials;
/// use mapit_tracker::rest::MapitClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = MapitClient::builder().build()?;
///     let credentials = Credentials::from_env()?;
///
///     let bundle = client.authenticate(&credentials).await?;
///     let reading = client.get_status(&bundle).await?;
///     println!("{} km/h at {}, {}", reading.speed, reading.latitude, reading.longitude);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MapitClient {
    http_client: ClientWithMiddleware,
    base_url: Url,
    host: String,
    identity_provider_url: String,
    identity_url: String,
    region: String,
    service: String,
}

/// How much of an undecodable body goes into the error.
#[derive(Clone, Copy)]
enum BodyDisplay {
    /// Sign-in responses carry tokens and keys: position and size only.
    Redacted,
    Truncated,
}

impl BodyDisplay {
    fn describe(self, error: &serde_json::Error, body: &str) -> String {
        match self {
            BodyDisplay::Redacted => format!(
                "Failed to parse response: {:?} error at line {} column {} ({} bytes)",
                error.classify(),
                error.line(),
                error.column(),
                body.len()
            ),
            BodyDisplay::Truncated => format!(
                "Failed to parse response: {error}. Body: {}",
                truncate_body(body)
            ),
        }
    }
}

/// The secrets a signed request carries.
struct SigningIdentity<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    session_token: &'a str,
    id_token: &'a str,
}

impl<'a> From<&'a TokenBundle> for SigningIdentity<'a> {
    fn from(bundle: &'a TokenBundle) -> Self {
        Self {
            access_key: &bundle.access_key,
            secret_key: &bundle.secret_key,
            session_token: &bundle.session_token,
            id_token: &bundle.id_token,
        }
    }
}

impl MapitClient {
    /// Create a new client builder.
    pub fn builder() -> MapitClientBuilder {
        MapitClientBuilder::new()
    }

    /// Region the client signs for.
    pub fn region(&self) -> &str {
        &self.region
    }

    // ========== Sign-in sequence ==========

    /// Run the four-step sign-in and return a complete token bundle.
    ///
    /// 1. user pool password auth → id + access token
    /// 2. identity pool `GetId` → identity id
    /// 3. `GetCredentialsForIdentity` → temporary AWS keys
    /// 4. signed account lookup by e-mail → account id
    ///
    /// Any failing step fails the whole sequence.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<TokenBundle, TrackerError> {
        debug!(username = %credentials.username, "Starting authentication");

        let user = self.initiate_auth(credentials).await?;
        let identity_id = self.get_identity_id(credentials, &user.id_token).await?;
        let temporary = self
            .get_credentials_for_identity(credentials, &identity_id, &user.id_token)
            .await?;
        let account_id = self
            .get_account_id(&temporary, &user.id_token, &credentials.username)
            .await?;

        let bundle = TokenBundle {
            access_key: temporary.access_key_id,
            secret_key: temporary.secret_key,
            session_token: temporary.session_token,
            identity_id,
            id_token: user.id_token,
            access_token: user.access_token,
            account_id,
        };
        if !bundle.is_complete() {
            return Err(TrackerError::Auth(
                "Sign-in returned an empty token".to_string(),
            ));
        }

        info!(account_id = %bundle.account_id, "Authentication successful");
        Ok(bundle)
    }

    /// Password sign-in against the user pool.
    pub async fn initiate_auth(&self, credentials: &Credentials) -> Result<UserPoolTokens, TrackerError> {
        let body = InitiateAuthRequest {
            auth_flow: AUTH_FLOW,
            client_id: &credentials.client_id,
            auth_parameters: AuthParameters {
                username: &credentials.username,
                password: credentials.expose_password(),
            },
            client_metadata: HashMap::new(),
        };
        let response: InitiateAuthResponse = self
            .cognito_post(&self.identity_provider_url, targets::INITIATE_AUTH, &body)
            .await?;
        Ok(response.authentication_result)
    }

    /// Fetch the user profile for an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<UserProfile, TrackerError> {
        self.cognito_post(
            &self.identity_provider_url,
            targets::GET_USER,
            &GetUserRequest { access_token },
        )
        .await
    }

    /// Resolve the federated identity id for a user pool id token.
    pub async fn get_identity_id(
        &self,
        credentials: &Credentials,
        id_token: &str,
    ) -> Result<String, TrackerError> {
        let body = IdentityRequest {
            identity_pool_id: Some(&credentials.identity_pool_id),
            identity_id: None,
            logins: self.logins(credentials, id_token),
        };
        let response: GetIdResponse = self
            .cognito_post(&self.identity_url, targets::GET_ID, &body)
            .await?;
        Ok(response.identity_id)
    }

    /// Exchange an identity for temporary AWS credentials.
    pub async fn get_credentials_for_identity(
        &self,
        credentials: &Credentials,
        identity_id: &str,
        id_token: &str,
    ) -> Result<TemporaryCredentials, TrackerError> {
        let body = IdentityRequest {
            identity_pool_id: None,
            identity_id: Some(identity_id),
            logins: self.logins(credentials, id_token),
        };
        let response: GetCredentialsResponse = self
            .cognito_post(&self.identity_url, targets::GET_CREDENTIALS_FOR_IDENTITY, &body)
            .await?;
        Ok(response.credentials)
    }

    /// Look up the vendor account id for an e-mail address.
    pub async fn get_account_id(
        &self,
        temporary: &TemporaryCredentials,
        id_token: &str,
        email: &str,
    ) -> Result<String, TrackerError> {
        let identity = SigningIdentity {
            access_key: &temporary.access_key_id,
            secret_key: &temporary.secret_key,
            session_token: &temporary.session_token,
            id_token,
        };
        let query = account_query(email);
        let accounts: Vec<Account> = self.signed_get(&identity, paths::ACCOUNTS, &query).await?;
        accounts
            .into_iter()
            .next()
            .map(|account| account.id)
            .ok_or_else(|| TrackerError::InvalidResponse(format!("No account registered for {email}")))
    }

    // ========== Status ==========

    /// Fetch the raw account summary.
    pub async fn get_summary(&self, bundle: &TokenBundle) -> Result<AccountSummary, TrackerError> {
        let path = paths::summary(&bundle.account_id);
        self.signed_get(&SigningIdentity::from(bundle), &path, "").await
    }

    /// Fetch the normalized status of the first vehicle.
    pub async fn get_status(&self, bundle: &TokenBundle) -> Result<Reading, TrackerError> {
        let reading = self.get_summary(bundle).await?.first_reading()?;
        debug!(
            account_id = %bundle.account_id,
            status = %reading.status,
            speed = reading.speed,
            "Status retrieved"
        );
        Ok(reading)
    }

    // ========== Plumbing ==========

    fn logins<'a>(&self, credentials: &Credentials, id_token: &'a str) -> HashMap<String, &'a str> {
        let provider = format!(
            "{}/{}",
            identity_provider_host(&self.region),
            credentials.user_pool_id
        );
        HashMap::from([(provider, id_token)])
    }

    /// POST to a Cognito JSON endpoint.
    async fn cognito_post<T, B>(&self, url: &str, target: &str, body: &B) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        debug!(target_op = target, "Cognito request");
        let payload = serde_json::to_vec(body)?;
        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("x-amz-target", target)
            .body(payload)
            .send()
            .await?;
        Self::parse_response(response, BodyDisplay::Redacted).await
    }

    /// Signed GET against the status API.
    async fn signed_get<T>(
        &self,
        identity: &SigningIdentity<'_>,
        path: &str,
        query: &str,
    ) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
    {
        let signed = sign_request(
            identity.access_key,
            identity.secret_key,
            &SigningScope {
                region: &self.region,
                service: &self.service,
            },
            &CanonicalRequest {
                method: "GET",
                path,
                query,
                host: &self.host,
            },
            OffsetDateTime::now_utc(),
        )?;

        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.set_query(Some(query));
        }

        debug!(path, "Signed request");
        let response = self
            .http_client
            .get(url)
            .header(HOST, &self.host)
            .header(ACCEPT, ACCEPT_JSON)
            .header("X-Amz-Security-Token", identity.session_token)
            .header("X-Id-Token", identity.id_token)
            .header("x-amz-date", &signed.amz_date)
            .header(AUTHORIZATION, &signed.authorization)
            .send()
            .await?;
        Self::parse_response(response, BodyDisplay::Truncated).await
    }

    /// Map the HTTP status, then decode the JSON body.
    async fn parse_response<T>(
        response: reqwest::Response,
        display: BodyDisplay,
    ) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TrackerError::from_status(status, body));
        }

        serde_json::from_str(&body)
            .map_err(|e| TrackerError::InvalidResponse(display.describe(&e, &body)))
    }
}

/// Account lookup query in SigV4 canonical form (RFC 3986 unreserved set).
fn account_query(email: &str) -> String {
    format!("email={}", urlencoding::encode(email))
}

impl VehicleApi for MapitClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<TokenBundle, TrackerError> {
        MapitClient::authenticate(self, credentials).await
    }

    async fn fetch_status(&self, bundle: &TokenBundle) -> Result<Reading, TrackerError> {
        MapitClient::get_status(self, bundle).await
    }
}

impl std::fmt::Debug for MapitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapitClient")
            .field("base_url", &self.base_url.as_str())
            .field("identity_provider_url", &self.identity_provider_url)
            .field("identity_url", &self.identity_url)
            .field("region", &self.region)
            .finish()
    }
}

/// Builder for [`MapitClient`].
pub struct MapitClientBuilder {
    base_url: String,
    identity_provider_url: Option<String>,
    identity_url: Option<String>,
    region: String,
    service: String,
    user_agent: Option<String>,
    timeout: Duration,
}

impl MapitClientBuilder {
    /// Create a new builder with the production endpoints.
    pub fn new() -> Self {
        Self {
            base_url: MAPIT_BASE_URL.to_string(),
            identity_provider_url: None,
            identity_url: None,
            region: MAPIT_REGION.to_string(),
            service: MAPIT_SERVICE.to_string(),
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the status API base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the user pool endpoint URL.
    pub fn identity_provider_url(mut self, url: impl Into<String>) -> Self {
        self.identity_provider_url = Some(url.into());
        self
    }

    /// Override the identity pool endpoint URL.
    pub fn identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = Some(url.into());
        self
    }

    /// Set the AWS region. Also moves the default Cognito endpoints.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the SigV4 service name.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<MapitClient, TrackerError> {
        let base_url = Url::parse(&self.base_url)?;
        let host = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(TrackerError::Auth(format!(
                    "Base URL {} has no host to sign",
                    self.base_url
                )));
            }
        };

        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("mapit-tracker/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("mapit-tracker"));
        headers.insert(USER_AGENT, header_value);

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()?;

        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        let identity_provider_url = self
            .identity_provider_url
            .unwrap_or_else(|| format!("https://{}/", identity_provider_host(&self.region)));
        let identity_url = self
            .identity_url
            .unwrap_or_else(|| format!("https://{}/", identity_host(&self.region)));

        Ok(MapitClient {
            http_client,
            base_url,
            host,
            identity_provider_url,
            identity_url,
            region: self.region,
            service: self.service,
        })
    }
}

impl Default for MapitClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
