use crate::{Result as AuthErrorResult, Session};

use async_trait::async_trait;

/// Hosted backend authentication.
///
/// Implementations keep the "current" session; a successful exchange or
/// refresh replaces it.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_session(&self) -> AuthErrorResult<Option<Session>>;

    /// Exchange a one-time magic-link token for a session.
    async fn exchange_for_session(&self, token: &str) -> AuthErrorResult<Session>;

    async fn refresh_session(&self, refresh_credential: &str) -> AuthErrorResult<Session>;

    async fn sign_out(&self) -> AuthErrorResult<()>;
}
