use crate::{
    AttemptTracker, AuthError, AuthProvider, BridgeSettings, Identity, LocalFallbackPinBackend,
    LocalPinCache, Pin, PinBackend, PinCheck, PinStatus, ProfileStore, RemotePinBackend,
    Result as AuthErrorResult, VerificationSource, VerifyResult,
};

use std::sync::Arc;

use log::{info, warn};

/// PIN Verifier: picks the remote or local-fallback [`PinBackend`] per call
/// and layers a client-side consecutive-failure lockout on top.
pub struct PinVerifier {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    remote: RemotePinBackend,
    local: Option<LocalFallbackPinBackend>,
    cache: Arc<LocalPinCache>,
    attempts: AttemptTracker,
}

impl PinVerifier {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        cache: Arc<LocalPinCache>,
        settings: &BridgeSettings,
    ) -> Self {
        let local = settings
            .local_fallback
            .then(|| LocalFallbackPinBackend::new(Arc::clone(&cache)));

        Self {
            auth,
            remote: RemotePinBackend::new(Arc::clone(&profiles)),
            profiles,
            local,
            cache,
            attempts: AttemptTracker::new(settings.max_attempts),
        }
    }

    pub fn attempts(&self) -> &AttemptTracker {
        &self.attempts
    }

    pub fn cache(&self) -> &LocalPinCache {
        &self.cache
    }

    pub fn local_fallback_enabled(&self) -> bool {
        self.local.is_some()
    }

    /// Whether `identity` is PIN-protected, i.e. its profile has a PIN hash.
    ///
    /// Falls back to the local cache when the backend is unreachable and the
    /// fallback is enabled.
    pub async fn lookup(&self, identity: Identity) -> AuthErrorResult<PinStatus> {
        match self.profiles.find_by_identity(identity).await {
            Ok(Some(profile)) => Ok(PinStatus {
                identity,
                protected: profile.is_pin_protected(),
                account_id: Some(profile.account_id),
                claimed: true,
                source: VerificationSource::Backend,
            }),
            Ok(None) => Ok(PinStatus {
                identity,
                account_id: None,
                claimed: false,
                protected: false,
                source: VerificationSource::Backend,
            }),
            Err(e @ AuthError::NetworkUnavailable { .. }) if self.local.is_some() => {
                warn!("Profile lookup for {identity} offline, using local cache: {e}");
                let protected = self.cache.contains(identity)?;
                Ok(PinStatus {
                    identity,
                    account_id: None,
                    claimed: protected,
                    protected,
                    source: VerificationSource::LocalFallback,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Set a PIN through the backend. Fails closed: nothing is cached
    /// locally unless the backend write succeeded.
    pub async fn set(&self, identity: Identity, account_id: &str, pin: &Pin) -> AuthErrorResult<()> {
        let backend = self.select_backend().await?;
        backend.set(identity, Some(account_id), pin).await?;

        self.attempts.reset(identity);
        self.remember_best_effort(identity, pin);
        Ok(())
    }

    pub async fn verify(
        &self,
        identity: Identity,
        account_id: Option<&str>,
        pin: &Pin,
    ) -> AuthErrorResult<VerifyResult> {
        if self.attempts.is_locked(identity) {
            return Ok(VerifyResult::LockedOut);
        }

        let backend = self.select_backend().await?;

        let (check, source) = match backend.check(identity, account_id, pin).await {
            Ok(check) => (check, backend.source()),
            Err(e @ AuthError::NetworkUnavailable { .. }) => match &self.local {
                Some(local) if backend.source() == VerificationSource::Backend => {
                    warn!("Backend unreachable verifying {identity}, using local fallback: {e}");
                    match local.check(identity, account_id, pin).await {
                        Ok(check) => (check, local.source()),
                        // No cached PIN either: the network failure is the real cause
                        Err(AuthError::NotAuthenticated { .. }) => return Err(e),
                        Err(other) => return Err(other),
                    }
                }
                _ => return Err(e),
            },
            Err(e) => return Err(e),
        };

        let result = match check {
            PinCheck::Match => {
                self.attempts.reset(identity);
                if source == VerificationSource::Backend {
                    self.remember_best_effort(identity, pin);
                }
                VerifyResult::Correct(source)
            }
            PinCheck::Mismatch => {
                let attempts = self.attempts.record_failure(identity);
                let max_attempts = self.attempts.max_attempts();
                if attempts >= max_attempts {
                    VerifyResult::LockedOut
                } else {
                    VerifyResult::Incorrect {
                        attempts,
                        remaining: max_attempts - attempts,
                    }
                }
            }
            PinCheck::LockedOut => {
                self.attempts.lock(identity);
                VerifyResult::LockedOut
            }
        };

        if result == VerifyResult::LockedOut {
            info!("{identity} locked out after repeated PIN failures");
        }
        Ok(result)
    }

    /// The backend already accepted `pin`; a cache write failure only costs
    /// the offline path.
    fn remember_best_effort(&self, identity: Identity, pin: &Pin) {
        if self.local.is_none() {
            return;
        }

        if let Err(e) = self.cache.remember(identity, pin) {
            warn!("Could not cache PIN for {identity}, offline unlock unavailable: {e}");
        }
    }

    /// Remote when a backend session is live, otherwise the local fallback
    /// if enabled.
    async fn select_backend(&self) -> AuthErrorResult<&dyn PinBackend> {
        let live = match self.auth.current_session().await {
            Ok(session) => session.is_some(),
            Err(AuthError::NetworkUnavailable { .. }) => false,
            Err(e) => return Err(e),
        };

        if live {
            return Ok(&self.remote);
        }

        match &self.local {
            Some(local) => Ok(local),
            None => Err(AuthError::not_authenticated(
                "no live backend session and local fallback is disabled",
            )),
        }
    }
}
