use crate::{Identity, VerificationSource};

/// What the bridge knows about an identity's PIN at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinStatus {
    pub identity: Identity,
    pub account_id: Option<String>,
    pub claimed: bool,
    pub protected: bool,
    /// Whether the answer came from the backend or the local cache
    pub source: VerificationSource,
}
