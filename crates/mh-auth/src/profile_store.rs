use crate::{Identity, Pin, Profile, Result as AuthErrorResult};

use async_trait::async_trait;

/// Backend profile table plus the PIN remote procedures.
///
/// Hashing and server-side attempt tracking live behind `set_pin` and
/// `verify_pin`.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_identity(&self, identity: Identity) -> AuthErrorResult<Option<Profile>>;

    async fn find_by_account(&self, account_id: &str) -> AuthErrorResult<Option<Profile>>;

    /// Claim `identity` for the current session's account. `false` if taken.
    async fn claim_identity(&self, identity: Identity) -> AuthErrorResult<bool>;

    async fn set_pin(&self, account_id: &str, pin: &Pin) -> AuthErrorResult<bool>;

    async fn verify_pin(&self, account_id: &str, pin: &Pin) -> AuthErrorResult<bool>;
}
