use crate::{
    AuthError, Identity, LocalPinCache, Pin, PinBackend, PinCheck, Result as AuthErrorResult,
    VerificationSource,
};

use std::sync::Arc;

use async_trait::async_trait;

/// Offline comparison against [`LocalPinCache`]. Cannot set PINs.
pub struct LocalFallbackPinBackend {
    cache: Arc<LocalPinCache>,
}

impl LocalFallbackPinBackend {
    pub fn new(cache: Arc<LocalPinCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PinBackend for LocalFallbackPinBackend {
    fn source(&self) -> VerificationSource {
        VerificationSource::LocalFallback
    }

    async fn set(
        &self,
        _identity: Identity,
        _account_id: Option<&str>,
        _pin: &Pin,
    ) -> AuthErrorResult<()> {
        Err(AuthError::not_authenticated(
            "setting a PIN requires a live backend session",
        ))
    }

    async fn check(
        &self,
        identity: Identity,
        _account_id: Option<&str>,
        pin: &Pin,
    ) -> AuthErrorResult<PinCheck> {
        // Nothing to compare against is not a wrong PIN
        if !self.cache.contains(identity)? {
            return Err(AuthError::not_authenticated(format!(
                "no cached PIN for {identity}"
            )));
        }

        if self.cache.matches(identity, pin)? {
            Ok(PinCheck::Match)
        } else {
            Ok(PinCheck::Mismatch)
        }
    }
}
