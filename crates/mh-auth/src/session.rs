use crate::Identity;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live backend session handed out by the authentication collaborator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: String,
    pub access_token: String,
    pub refresh_credential: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Long-lived credential cached locally so a PIN unlock can restore the
/// backend session without another magic link.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub identity: Identity,
    pub account_id: String,
    pub refresh_credential: String,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn capture(identity: Identity, session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            account_id: session.account_id.clone(),
            refresh_credential: session.refresh_credential.clone(),
            stored_at: now,
            expires_at: session.expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("identity", &self.identity)
            .field("account_id", &self.account_id)
            .field("stored_at", &self.stored_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
