use crate::{Identity, Pin, Result as AuthErrorResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which tier accepted a PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    /// Hashed comparison with server-side attempt tracking
    Backend,
    /// Unhashed comparison against the local cache; no backend session
    LocalFallback,
}

/// Raw answer from a [`PinBackend`], before client-side attempt accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    Match,
    Mismatch,
    LockedOut,
}

/// Where PINs are persisted and compared.
#[async_trait]
pub trait PinBackend: Send + Sync {
    fn source(&self) -> VerificationSource;

    async fn set(
        &self,
        identity: Identity,
        account_id: Option<&str>,
        pin: &Pin,
    ) -> AuthErrorResult<()>;

    async fn check(
        &self,
        identity: Identity,
        account_id: Option<&str>,
        pin: &Pin,
    ) -> AuthErrorResult<PinCheck>;
}
