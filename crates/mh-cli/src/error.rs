use mh_auth::AuthError;
use mh_config::ConfigError;
use mh_supabase::ClientError;

use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Backend client error: {0}")]
    Client(#[from] ClientError),

    #[error("Logger error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    #[error("No backend configured: set [backend] url and anon_key or MH_BACKEND_URL / MH_BACKEND_ANON_KEY {location}")]
    NoBackend { location: ErrorLocation },

    #[error("{message} {location}")]
    Aborted {
        message: String,
        location: ErrorLocation,
    },

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Follow-up advice printed under the error, if any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Auth(AuthError::Storage { source }) => Some(source.recovery_hint()),
            Self::Auth(AuthError::NotAuthenticated { .. } | AuthError::NoActiveSession { .. }) => {
                Some("Sign in with `mh request-link --email <address>`, then `mh login --token <token>`.")
            }
            Self::Auth(e) if e.is_retryable() => Some("This may be temporary. Try again."),
            _ => None,
        }
    }

    #[track_caller]
    pub fn logger(message: impl Into<String>) -> Self {
        Self::Logger {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn no_backend() -> Self {
        Self::NoBackend {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
