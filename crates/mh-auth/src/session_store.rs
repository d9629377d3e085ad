use crate::storage::json_map::JsonMap;
use crate::{
    AuthError, AuthProvider, Identity, KeyValueStore, Result as AuthErrorResult, Session,
    StoredSession,
};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{debug, info, warn};

const SESSION_CACHE_KEY: &str = "munro_sessions";

type SessionMap = BTreeMap<String, StoredSession>;

/// Identity Session Store: at most one [`StoredSession`] per identity,
/// persisted as a single JSON mapping keyed by identity name.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles on the mapping
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Capture the collaborator's live session for `identity`.
    pub async fn store(
        &self,
        identity: Identity,
        auth: &dyn AuthProvider,
    ) -> AuthErrorResult<StoredSession> {
        let session = auth
            .current_session()
            .await?
            .ok_or_else(AuthError::no_active_session)?;

        self.store_session(identity, &session)
    }

    /// Persist `session` for `identity`, replacing any previous record.
    pub fn store_session(
        &self,
        identity: Identity,
        session: &Session,
    ) -> AuthErrorResult<StoredSession> {
        let stored = StoredSession::capture(identity, session, Utc::now());

        self.update(|sessions| {
            sessions.insert(identity.as_str().to_string(), stored.clone());
        })?;

        info!(
            "Stored session for {identity} (expires {})",
            stored.expires_at
        );
        Ok(stored)
    }

    /// True iff a non-expired record exists. Expired records are purged.
    pub fn has_valid(&self, identity: Identity) -> AuthErrorResult<bool> {
        let now = Utc::now();
        let key = identity.as_str();

        let valid = self.update(|sessions| match sessions.get(key) {
            Some(stored) if stored.is_expired(now) => {
                sessions.remove(key);
                debug!("Evicted expired session for {identity}");
                false
            }
            Some(_) => true,
            None => false,
        })?;

        Ok(valid)
    }

    /// Read without eviction.
    pub fn get(&self, identity: Identity) -> AuthErrorResult<Option<StoredSession>> {
        let _guard = self.lock();
        let mut sessions = self.map().load::<StoredSession>()?;
        Ok(sessions.remove(identity.as_str()))
    }

    /// Exchange the stored refresh credential for a fresh backend session.
    ///
    /// On success the stored credential and expiry are rotated. A rejected
    /// credential deletes the record; a network failure leaves it in place.
    pub async fn restore(
        &self,
        identity: Identity,
        auth: &dyn AuthProvider,
    ) -> AuthErrorResult<Session> {
        let Some(stored) = self.get(identity)? else {
            return Err(AuthError::restore_failed(identity, "no stored session"));
        };

        if stored.refresh_credential.is_empty() {
            self.clear(identity)?;
            return Err(AuthError::restore_failed(identity, "stored session has no credential"));
        }

        if stored.is_expired(Utc::now()) {
            self.clear(identity)?;
            return Err(AuthError::restore_failed(identity, "stored session expired"));
        }

        let session = match auth.refresh_session(&stored.refresh_credential).await {
            Ok(session) => session,
            Err(e @ AuthError::NetworkUnavailable { .. }) => {
                warn!("Could not reach backend to restore {identity}: {e}");
                return Err(AuthError::restore_failed(identity, e.to_string()));
            }
            Err(e) => {
                warn!("Stored session for {identity} rejected, removing: {e}");
                self.clear(identity)?;
                return Err(AuthError::restore_failed(identity, e.to_string()));
            }
        };

        self.update(|sessions| {
            let entry = sessions
                .entry(identity.as_str().to_string())
                .or_insert_with(|| stored.clone());
            if !session.refresh_credential.is_empty() {
                entry.refresh_credential = session.refresh_credential.clone();
            }
            entry.expires_at = session.expires_at;
        })?;

        info!("Session restored for {identity}");
        Ok(session)
    }

    pub fn clear(&self, identity: Identity) -> AuthErrorResult<()> {
        self.update(|sessions| {
            sessions.remove(identity.as_str());
        })
    }

    pub fn clear_all(&self) -> AuthErrorResult<()> {
        let _guard = self.lock();
        self.map().clear()?;
        Ok(())
    }

    /// Reverse lookup across stored sessions.
    pub fn identity_for_account(&self, account_id: &str) -> AuthErrorResult<Option<Identity>> {
        let _guard = self.lock();
        let sessions = self.map().load::<StoredSession>()?;

        Ok(sessions
            .values()
            .find(|stored| stored.account_id == account_id)
            .map(|stored| stored.identity))
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionMap) -> R) -> AuthErrorResult<R> {
        let _guard = self.lock();
        let map = self.map();
        let mut sessions = map.load::<StoredSession>()?;
        let before = sessions.clone();

        let result = f(&mut sessions);

        if sessions != before {
            map.save(&sessions)?;
        }
        Ok(result)
    }

    fn map(&self) -> JsonMap<'_> {
        JsonMap::new(self.store.as_ref(), SESSION_CACHE_KEY)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
