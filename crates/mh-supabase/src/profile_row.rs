use mh_auth::{Identity, Profile};

use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;

/// One row of the `profiles_safe` view. The PIN hash is reduced to `has_pin`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRow {
    pub id: String,
    pub display_name: Option<String>,
    pub family_identity: Option<String>,
    #[serde(default)]
    pub has_pin: bool,
    #[serde(default)]
    pub pin_failed_attempts: Option<u32>,
    pub pin_lockout_until: Option<DateTime<Utc>>,
}

/// Columns requested from `profiles_safe`
pub(crate) const PROFILE_COLUMNS: &str =
    "id,display_name,family_identity,has_pin,pin_failed_attempts,pin_lockout_until";

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let identity = row
            .family_identity
            .as_deref()
            .and_then(|value| match value.parse::<Identity>() {
                Ok(identity) => Some(identity),
                Err(_) => {
                    warn!("Profile {} has unknown identity '{value}'", row.id);
                    None
                }
            });

        Profile {
            account_id: row.id,
            identity,
            display_name: row.display_name,
            has_pin: row.has_pin,
            pin_failed_attempts: row.pin_failed_attempts.unwrap_or(0),
            pin_lockout_until: row.pin_lockout_until,
        }
    }
}
