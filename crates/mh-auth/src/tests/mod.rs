mod unlock_machine;

use crate::{
    AuthBridgeContext, AuthError, AuthProvider, BridgeSettings, Identity, KeyValueStore,
    MemoryKeyValueStore, Pin, Profile, ProfileStore, Result as AuthErrorResult, Session,
    StorageError, StorageResult, UnlockMachine,
};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};

/// How the fake answers `refresh_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshBehavior {
    Succeed,
    Reject,
    Offline,
}

struct FakeState {
    session: Option<Session>,
    offline: bool,
    refresh: RefreshBehavior,
    profiles: HashMap<String, Profile>,
    pins: HashMap<String, String>,
    verify_delay: Option<Duration>,
    rotations: u32,
}

/// In-memory stand-in for the hosted backend: authentication plus profiles.
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    verify_calls: AtomicUsize,
    set_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    claim_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    last_set: Mutex<Option<(String, String)>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                session: None,
                offline: false,
                refresh: RefreshBehavior::Succeed,
                profiles: HashMap::new(),
                pins: HashMap::new(),
                verify_delay: None,
                rotations: 0,
            }),
            verify_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            last_set: Mutex::new(None),
        })
    }

    /// Register an account that has claimed `identity`, optionally with a PIN.
    pub(crate) fn with_profile(&self, account_id: &str, identity: Identity, pin: Option<&str>) {
        let mut state = self.state();
        state.profiles.insert(
            account_id.to_string(),
            Profile {
                account_id: account_id.to_string(),
                identity: Some(identity),
                display_name: Some(identity.to_string()),
                has_pin: pin.is_some(),
                pin_failed_attempts: 0,
                pin_lockout_until: None,
            },
        );
        if let Some(pin) = pin {
            state.pins.insert(account_id.to_string(), pin.to_string());
        }
    }

    /// Make `account_id` the live session.
    pub(crate) fn sign_in(&self, account_id: &str) -> Session {
        let session = session_for(account_id, TimeDelta::hours(1));
        self.state().session = Some(session.clone());
        session
    }

    pub(crate) fn drop_session(&self) {
        self.state().session = None;
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    pub(crate) fn set_refresh(&self, refresh: RefreshBehavior) {
        self.state().refresh = refresh;
    }

    pub(crate) fn set_verify_delay(&self, delay: Duration) {
        self.state().verify_delay = Some(delay);
    }

    pub(crate) fn lock_out_on_server(&self, account_id: &str) {
        if let Some(profile) = self.state().profiles.get_mut(account_id) {
            profile.pin_lockout_until = Some(Utc::now() + TimeDelta::minutes(15));
        }
    }

    pub(crate) fn live_account(&self) -> Option<String> {
        self.state().session.as_ref().map(|s| s.account_id.clone())
    }

    pub(crate) fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_set(&self) -> Option<(String, String)> {
        self.last_set.lock().unwrap().clone()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn ensure_online(&self) -> AuthErrorResult<()> {
        if self.state().offline {
            return Err(AuthError::network_unavailable("fake backend offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn current_session(&self) -> AuthErrorResult<Option<Session>> {
        Ok(self.state().session.clone())
    }

    async fn exchange_for_session(&self, token: &str) -> AuthErrorResult<Session> {
        self.ensure_online()?;
        let account_id = token
            .strip_prefix("link-")
            .ok_or_else(|| AuthError::not_authenticated("magic link expired"))?;
        Ok(self.sign_in(account_id))
    }

    async fn refresh_session(&self, refresh_credential: &str) -> AuthErrorResult<Session> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state();
        match state.refresh {
            RefreshBehavior::Offline => Err(AuthError::network_unavailable("fake backend offline")),
            RefreshBehavior::Reject => Err(AuthError::not_authenticated("refresh token revoked")),
            RefreshBehavior::Succeed => {
                let account_id = refresh_credential
                    .strip_prefix("refresh-")
                    .and_then(|rest| rest.split('#').next())
                    .ok_or_else(|| AuthError::not_authenticated("malformed refresh token"))?
                    .to_string();

                state.rotations += 1;
                let mut session = session_for(&account_id, TimeDelta::hours(2));
                session.refresh_credential = format!("refresh-{account_id}#{}", state.rotations);
                state.session = Some(session.clone());
                Ok(session)
            }
        }
    }

    async fn sign_out(&self) -> AuthErrorResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.state().session = None;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FakeBackend {
    async fn find_by_identity(&self, identity: Identity) -> AuthErrorResult<Option<Profile>> {
        self.ensure_online()?;
        Ok(self
            .state()
            .profiles
            .values()
            .find(|profile| profile.identity == Some(identity))
            .cloned())
    }

    async fn find_by_account(&self, account_id: &str) -> AuthErrorResult<Option<Profile>> {
        self.ensure_online()?;
        Ok(self.state().profiles.get(account_id).cloned())
    }

    async fn claim_identity(&self, identity: Identity) -> AuthErrorResult<bool> {
        self.ensure_online()?;
        self.claim_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state();
        let Some(account_id) = state.session.as_ref().map(|s| s.account_id.clone()) else {
            return Err(AuthError::not_authenticated("no session"));
        };

        if state
            .profiles
            .values()
            .any(|profile| profile.identity == Some(identity))
        {
            return Ok(false);
        }

        let profile = state
            .profiles
            .entry(account_id.clone())
            .or_insert_with(|| Profile {
                account_id,
                identity: None,
                display_name: None,
                has_pin: false,
                pin_failed_attempts: 0,
                pin_lockout_until: None,
            });
        profile.identity = Some(identity);
        Ok(true)
    }

    async fn set_pin(&self, account_id: &str, pin: &Pin) -> AuthErrorResult<bool> {
        self.ensure_online()?;
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_set.lock().unwrap() = Some((account_id.to_string(), pin.expose().to_string()));

        let mut state = self.state();
        let Some(profile) = state.profiles.get_mut(account_id) else {
            return Ok(false);
        };
        profile.has_pin = true;
        profile.pin_failed_attempts = 0;
        state
            .pins
            .insert(account_id.to_string(), pin.expose().to_string());
        Ok(true)
    }

    async fn verify_pin(&self, account_id: &str, pin: &Pin) -> AuthErrorResult<bool> {
        self.ensure_online()?;
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.state().verify_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let correct = state.pins.get(account_id).map(String::as_str) == Some(pin.expose());
        let Some(profile) = state.profiles.get_mut(account_id) else {
            return Ok(false);
        };

        if profile.is_locked_out(Utc::now()) {
            return Ok(false);
        }

        if correct {
            profile.pin_failed_attempts = 0;
        } else {
            profile.pin_failed_attempts += 1;
        }
        Ok(correct)
    }
}

pub(crate) fn session_for(account_id: &str, lifetime: TimeDelta) -> Session {
    Session {
        account_id: account_id.to_string(),
        access_token: format!("access-{account_id}"),
        refresh_credential: format!("refresh-{account_id}"),
        expires_at: Utc::now() + lifetime,
    }
}

pub(crate) fn fallback_settings() -> BridgeSettings {
    BridgeSettings {
        local_fallback: true,
        ..BridgeSettings::default()
    }
}

pub(crate) fn context_with(
    backend: &Arc<FakeBackend>,
    store: &Arc<MemoryKeyValueStore>,
    settings: BridgeSettings,
) -> AuthBridgeContext {
    let auth: Arc<dyn AuthProvider> = backend.clone();
    let profiles: Arc<dyn ProfileStore> = backend.clone();
    let storage: Arc<dyn KeyValueStore> = store.clone();
    AuthBridgeContext::new(settings, auth, profiles, storage)
}

pub(crate) fn machine_with(
    backend: &Arc<FakeBackend>,
    settings: BridgeSettings,
) -> (UnlockMachine, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let machine = UnlockMachine::new(context_with(backend, &store, settings));
    (machine, store)
}

/// Memory store that refuses every write to one key, like a full disk.
pub(crate) struct FailingWrites {
    inner: MemoryKeyValueStore,
    key: &'static str,
}

impl FailingWrites {
    pub(crate) fn new(key: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKeyValueStore::new(),
            key,
        })
    }
}

impl KeyValueStore for FailingWrites {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if key == self.key {
            return Err(StorageError::file_write(
                PathBuf::from(format!("{key}.json")),
                std::io::Error::other("no space left on device"),
            ));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }
}

pub(crate) fn machine_over(
    backend: &Arc<FakeBackend>,
    storage: Arc<dyn KeyValueStore>,
    settings: BridgeSettings,
) -> UnlockMachine {
    let auth: Arc<dyn AuthProvider> = backend.clone();
    let profiles: Arc<dyn ProfileStore> = backend.clone();
    UnlockMachine::new(AuthBridgeContext::new(settings, auth, profiles, storage))
}
