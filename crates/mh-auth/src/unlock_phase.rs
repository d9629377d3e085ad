use crate::{AuthError, Identity, Pin, UnlockState};

/// Two-step PIN creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationStep {
    Enter,
    Confirm { first: Pin },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Backend authentication (magic link) must complete first
    NotAuthenticated,
    NetworkUnavailable,
    IdentityTaken,
    Other,
}

impl FailureReason {
    pub fn from_error(error: &AuthError) -> Self {
        match error {
            AuthError::NotAuthenticated { .. } | AuthError::NoActiveSession { .. } => {
                Self::NotAuthenticated
            }
            AuthError::NetworkUnavailable { .. } => Self::NetworkUnavailable,
            AuthError::IdentityTaken { .. } => Self::IdentityTaken,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    SelectingIdentity,
    NeedsPinCreation {
        identity: Identity,
        account_id: Option<String>,
        step: CreationStep,
    },
    NeedsPinEntry {
        identity: Identity,
        account_id: Option<String>,
    },
    /// A backend call is in flight; new submissions are ignored
    Verifying { identity: Identity },
    Unlocked(UnlockState),
    /// Only sign-out leaves this phase
    Locked { identity: Identity },
    Failed {
        identity: Identity,
        reason: FailureReason,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectingIdentity => "selecting an identity",
            Self::NeedsPinCreation { .. } => "creating a PIN",
            Self::NeedsPinEntry { .. } => "awaiting PIN entry",
            Self::Verifying { .. } => "verifying",
            Self::Unlocked(_) => "unlocked",
            Self::Locked { .. } => "locked out",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        match self {
            Self::SelectingIdentity => None,
            Self::NeedsPinCreation { identity, .. }
            | Self::NeedsPinEntry { identity, .. }
            | Self::Verifying { identity }
            | Self::Locked { identity }
            | Self::Failed { identity, .. } => Some(*identity),
            Self::Unlocked(state) => Some(state.identity),
        }
    }
}
