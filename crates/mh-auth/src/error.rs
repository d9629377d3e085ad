use crate::{Identity, StorageError};

use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated: {message} {location}")]
    NotAuthenticated {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid PIN: {message} {location}")]
    InvalidPin {
        message: String,
        location: ErrorLocation,
    },

    #[error("No active backend session to store {location}")]
    NoActiveSession { location: ErrorLocation },

    #[error("Session restore failed for {identity}: {message} {location}")]
    RestoreFailed {
        identity: Identity,
        message: String,
        location: ErrorLocation,
    },

    #[error("Network unavailable: {message} {location}")]
    NetworkUnavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Identity {identity} is already claimed by another account {location}")]
    IdentityTaken {
        identity: Identity,
        location: ErrorLocation,
    },

    #[error("Unknown identity '{value}' {location}")]
    InvalidIdentity {
        value: String,
        location: ErrorLocation,
    },

    #[error("Cannot {action} while {phase} {location}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
        location: ErrorLocation,
    },

    #[error("Backend error: {message} {location}")]
    Backend {
        message: String,
        location: ErrorLocation,
    },

    #[error("Storage error: {source}")]
    Storage {
        #[source]
        source: StorageError,
    },
}

impl AuthError {
    /// Stable code for display and telemetry
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated { .. } => "NOT_AUTHENTICATED",
            Self::InvalidPin { .. } => "INVALID_PIN",
            Self::NoActiveSession { .. } => "NO_ACTIVE_SESSION",
            Self::RestoreFailed { .. } => "RESTORE_FAILED",
            Self::NetworkUnavailable { .. } => "NETWORK_UNAVAILABLE",
            Self::IdentityTaken { .. } => "IDENTITY_TAKEN",
            Self::InvalidIdentity { .. } => "INVALID_IDENTITY",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
        }
    }

    /// Whether the same call may succeed if repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkUnavailable { .. } => true,
            Self::Storage { source } => source.is_transient(),
            _ => false,
        }
    }

    #[track_caller]
    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_pin(message: impl Into<String>) -> Self {
        Self::InvalidPin {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn no_active_session() -> Self {
        Self::NoActiveSession {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn restore_failed(identity: Identity, message: impl Into<String>) -> Self {
        Self::RestoreFailed {
            identity,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn identity_taken(identity: Identity) -> Self {
        Self::IdentityTaken {
            identity,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_transition(action: &'static str, phase: &'static str) -> Self {
        Self::InvalidTransition {
            action,
            phase,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(source: StorageError) -> Self {
        Self::Storage { source }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
