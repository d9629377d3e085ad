use crate::{Identity, VerificationSource};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Emitted to downstream consumers once a PIN unlock succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockState {
    pub identity: Identity,
    pub account_id: Option<String>,
    pub unlocked_at: DateTime<Utc>,
    pub source: VerificationSource,
    /// A backend session for this identity's account is live, so real-time
    /// features may be used
    pub backend_linked: bool,
}

impl UnlockState {
    pub fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        now - self.unlocked_at >= ttl
    }
}
