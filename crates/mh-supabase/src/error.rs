use mh_auth::AuthError;

use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Errors that can occur talking to the hosted backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request error: {message} {location}")]
    Http {
        message: String,
        location: ErrorLocation,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error: {message} (status: {status}, code: {code}) {location}")]
    Api {
        status: u16,
        code: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON parse error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Convert reqwest error with context
    #[track_caller]
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        ClientError::Http {
            message: err.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: err,
        }
    }

    /// Convert JSON error with context
    #[track_caller]
    pub fn from_json(err: serde_json::Error) -> Self {
        ClientError::Json {
            message: err.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: err,
        }
    }

    #[track_caller]
    pub fn api_error(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::Api {
            status,
            code: code.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// The backend could not be reached, as opposed to answering with an error.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Http { source, .. } => source.is_connect() || source.is_timeout(),
            Self::Api { status, .. } => matches!(status, 502..=504),
            Self::Json { .. } => false,
        }
    }

    /// The backend rejected the credentials we presented.
    pub fn is_rejected_credential(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                matches!(status, 401 | 403)
                    || (*status == 400
                        && matches!(
                            code.as_str(),
                            "invalid_grant" | "otp_expired" | "refresh_token_not_found"
                        ))
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        ClientError::from_reqwest(err)
    }
}

impl From<serde_json::Error> for ClientError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        ClientError::from_json(err)
    }
}

impl From<ClientError> for AuthError {
    #[track_caller]
    fn from(err: ClientError) -> Self {
        if err.is_unreachable() {
            AuthError::network_unavailable(err.to_string())
        } else if err.is_rejected_credential() {
            AuthError::not_authenticated(err.to_string())
        } else {
            AuthError::backend(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
