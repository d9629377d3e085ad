use serde::Deserialize;

/// Session payload returned by the auth `verify` and `token` endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: TokenUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenUser {
    pub id: String,
}
