//! Mapit and Cognito endpoint constants.

/// Base URL of the vendor status API.
pub const MAPIT_BASE_URL: &str = "https://core.prod.mapit.me";

/// AWS region hosting both the Cognito pools and the status API.
pub const MAPIT_REGION: &str = "eu-west-1";

/// Service name in the SigV4 credential scope.
pub const MAPIT_SERVICE: &str = "execute-api";

/// Host of the Cognito user pool (identity provider) endpoint.
pub fn identity_provider_host(region: &str) -> String {
    format!("cognito-idp.{region}.amazonaws.com")
}

/// Host of the Cognito federated identity endpoint.
pub fn identity_host(region: &str) -> String {
    format!("cognito-identity.{region}.amazonaws.com")
}

/// Status API paths.
pub mod paths {
    /// Account lookup, queried by `email`.
    pub const ACCOUNTS: &str = "/v1/accounts";

    /// Vehicle summary of one account.
    pub fn summary(account_id: &str) -> String {
        format!("{ACCOUNTS}/{account_id}/summary")
    }
}

/// `x-amz-target` values for the Cognito JSON APIs.
pub mod targets {
    pub const INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
    pub const GET_USER: &str = "AWSCognitoIdentityProviderService.GetUser";
    pub const GET_ID: &str = "AWSCognitoIdentityService.GetId";
    pub const GET_CREDENTIALS_FOR_IDENTITY: &str =
        "AWSCognitoIdentityService.GetCredentialsForIdentity";
}

/// Content type of the Cognito JSON protocol.
pub const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Sign-in flow used against the user pool.
pub const AUTH_FLOW: &str = "USER_PASSWORD_AUTH";
