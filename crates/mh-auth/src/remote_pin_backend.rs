use crate::{
    AuthError, Identity, Pin, PinBackend, PinCheck, ProfileStore, Result as AuthErrorResult,
    VerificationSource,
};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};

/// Backend-authoritative PINs via the profile store's remote procedures.
pub struct RemotePinBackend {
    profiles: Arc<dyn ProfileStore>,
}

impl RemotePinBackend {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    #[track_caller]
    fn require_account(account_id: Option<&str>) -> AuthErrorResult<&str> {
        account_id.ok_or_else(|| AuthError::not_authenticated("no backend account for identity"))
    }
}

#[async_trait]
impl PinBackend for RemotePinBackend {
    fn source(&self) -> VerificationSource {
        VerificationSource::Backend
    }

    async fn set(
        &self,
        identity: Identity,
        account_id: Option<&str>,
        pin: &Pin,
    ) -> AuthErrorResult<()> {
        let account_id = Self::require_account(account_id)?;

        if !self.profiles.set_pin(account_id, pin).await? {
            return Err(AuthError::backend(format!(
                "backend refused to set PIN for {identity}"
            )));
        }

        info!("PIN set for {identity}");
        Ok(())
    }

    async fn check(
        &self,
        identity: Identity,
        account_id: Option<&str>,
        pin: &Pin,
    ) -> AuthErrorResult<PinCheck> {
        let account_id = Self::require_account(account_id)?;

        if self.profiles.verify_pin(account_id, pin).await? {
            return Ok(PinCheck::Match);
        }

        // A false answer may also mean the server-side lockout kicked in
        match self.profiles.find_by_account(account_id).await {
            Ok(Some(profile)) if profile.is_locked_out(Utc::now()) => {
                info!("Backend reports {identity} locked out");
                Ok(PinCheck::LockedOut)
            }
            Ok(_) => Ok(PinCheck::Mismatch),
            Err(e) => {
                debug!("Lockout lookup for {identity} failed: {e}");
                Ok(PinCheck::Mismatch)
            }
        }
    }
}
