use crate::{
    AuthError, AuthProvider, BridgeSettings, Identity, KeyValueStore, LocalPinCache, PinVerifier,
    ProfileStore, Result as AuthErrorResult, Session, SessionStore, UnlockState,
};

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

/// Everything the bridge owns for one application session.
///
/// Constructed at app start and torn down by [`AuthBridgeContext::sign_out`].
pub struct AuthBridgeContext {
    settings: BridgeSettings,
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    sessions: SessionStore,
    verifier: PinVerifier,
    unlock: Option<UnlockState>,
}

impl AuthBridgeContext {
    pub fn new(
        settings: BridgeSettings,
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let cache = Arc::new(LocalPinCache::new(Arc::clone(&storage)));
        let verifier = PinVerifier::new(
            Arc::clone(&auth),
            Arc::clone(&profiles),
            cache,
            &settings,
        );

        Self {
            sessions: SessionStore::new(storage),
            settings,
            auth,
            profiles,
            verifier,
            unlock: None,
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn profiles(&self) -> &dyn ProfileStore {
        self.profiles.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn verifier(&self) -> &PinVerifier {
        &self.verifier
    }

    /// Finish a magic-link sign-in and remember the session for the
    /// account's claimed identity, if it has one.
    pub async fn complete_authentication(&self, token: &str) -> AuthErrorResult<Option<Identity>> {
        let session = self.auth.exchange_for_session(token).await?;
        info!("Authenticated account {}", session.account_id);

        let identity = self
            .profiles
            .find_by_account(&session.account_id)
            .await?
            .and_then(|profile| profile.identity);

        match identity {
            Some(identity) => {
                self.sessions.store_session(identity, &session)?;
            }
            None => debug!("Account {} has not claimed an identity", session.account_id),
        }

        Ok(identity)
    }

    /// Claim `identity` for the live session's account and store that session.
    pub async fn claim_identity(&self, identity: Identity) -> AuthErrorResult<Session> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or_else(|| AuthError::not_authenticated("claiming an identity requires sign-in"))?;

        if !self.profiles.claim_identity(identity).await? {
            return Err(AuthError::identity_taken(identity));
        }

        // The claim is already on the backend
        if let Err(e) = self.sessions.store_session(identity, &session) {
            warn!("Claimed {identity} but could not store its session: {e}");
        }
        info!("Account {} claimed {identity}", session.account_id);
        Ok(session)
    }

    /// The unlock, unless it has outlived the configured TTL.
    pub fn current_unlock(&mut self) -> Option<&UnlockState> {
        let ttl = self.settings.unlock_ttl;
        if self
            .unlock
            .as_ref()
            .is_some_and(|state| state.is_expired(ttl, Utc::now()))
        {
            debug!("Unlock expired");
            self.unlock = None;
        }
        self.unlock.as_ref()
    }

    pub(crate) fn record_unlock(&mut self, state: UnlockState) {
        self.unlock = Some(state);
    }

    pub fn clear_unlock(&mut self) {
        self.unlock = None;
    }

    /// Clear all local state, then sign out of the backend.
    ///
    /// Local state is cleared even if the backend call fails.
    pub async fn sign_out(&mut self) -> AuthErrorResult<()> {
        self.unlock = None;
        self.verifier.attempts().reset_all();
        self.sessions.clear_all()?;
        self.verifier.cache().clear()?;

        if let Err(e) = self.auth.sign_out().await {
            warn!("Backend sign-out failed, local state cleared anyway: {e}");
        }

        info!("Signed out");
        Ok(())
    }
}
