use crate::{
    AuthError, AuthProvider, Identity, Pin, Profile, ProfileStore, Result as AuthErrorResult,
    Session,
};

use async_trait::async_trait;

const NO_BACKEND: &str = "no backend configured";

/// Collaborator for local-only operation: never holds a session and every
/// remote call reports the network as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

#[async_trait]
impl AuthProvider for OfflineBackend {
    async fn current_session(&self) -> AuthErrorResult<Option<Session>> {
        Ok(None)
    }

    async fn exchange_for_session(&self, _token: &str) -> AuthErrorResult<Session> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }

    async fn refresh_session(&self, _refresh_credential: &str) -> AuthErrorResult<Session> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }

    async fn sign_out(&self) -> AuthErrorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for OfflineBackend {
    async fn find_by_identity(&self, _identity: Identity) -> AuthErrorResult<Option<Profile>> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }

    async fn find_by_account(&self, _account_id: &str) -> AuthErrorResult<Option<Profile>> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }

    async fn claim_identity(&self, _identity: Identity) -> AuthErrorResult<bool> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }

    async fn set_pin(&self, _account_id: &str, _pin: &Pin) -> AuthErrorResult<bool> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }

    async fn verify_pin(&self, _account_id: &str, _pin: &Pin) -> AuthErrorResult<bool> {
        Err(AuthError::network_unavailable(NO_BACKEND))
    }
}
