use crate::Identity;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-owned profile as visible to the client.
///
/// The PIN hash itself never leaves the backend; only whether one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: String,
    pub identity: Option<Identity>,
    pub display_name: Option<String>,
    pub has_pin: bool,
    #[serde(default)]
    pub pin_failed_attempts: u32,
    pub pin_lockout_until: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_pin_protected(&self) -> bool {
        self.has_pin
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.pin_lockout_until.is_some_and(|until| until > now)
    }
}
