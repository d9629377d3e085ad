use crate::error::{CliError, Result as CliResult};

use mh_auth::{
    AuthBridgeContext, AuthProvider, BridgeSettings, FileKeyValueStore, KeyValueStore,
    OfflineBackend, ProfileStore, UnlockMachine,
};
use mh_config::Config;
use mh_supabase::SupabaseClient;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use log::{info, warn};

/// The wired-up bridge for one CLI invocation.
pub(crate) struct Bridge {
    pub(crate) machine: UnlockMachine,
    /// None when running local-only
    pub(crate) client: Option<Arc<SupabaseClient>>,
}

impl Bridge {
    pub(crate) fn client(&self) -> CliResult<&SupabaseClient> {
        self.client.as_deref().ok_or_else(CliError::no_backend)
    }
}

pub(crate) fn bridge_settings(config: &Config) -> BridgeSettings {
    BridgeSettings {
        max_attempts: config.pin.max_attempts,
        local_fallback: config.pin.local_fallback,
        unlock_ttl: seconds(config.unlock.ttl_secs),
    }
}

pub(crate) fn connect(config: &Config) -> CliResult<Bridge> {
    let storage_path = config.storage_path()?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(storage_path.clone()));
    info!("Local storage at {}", storage_path.display());

    let client = match (&config.backend.url, &config.backend.anon_key) {
        (Some(url), Some(anon_key)) if config.backend.is_configured() => {
            Some(Arc::new(SupabaseClient::new(
                url,
                anon_key,
                Duration::from_secs(config.backend.timeout_secs),
                seconds(config.session.default_lifetime_secs),
            )?))
        }
        _ => None,
    };

    let (auth, profiles) = match &client {
        Some(client) => {
            let auth: Arc<dyn AuthProvider> = client.clone();
            let profiles: Arc<dyn ProfileStore> = client.clone();
            (auth, profiles)
        }
        None => {
            warn!("No backend configured, running local-only");
            let auth: Arc<dyn AuthProvider> = Arc::new(OfflineBackend);
            let profiles: Arc<dyn ProfileStore> = Arc::new(OfflineBackend);
            (auth, profiles)
        }
    };

    let context = AuthBridgeContext::new(bridge_settings(config), auth, profiles, storage);

    Ok(Bridge {
        machine: UnlockMachine::new(context),
        client,
    })
}

/// Config values are range-checked by `validate()`, so saturating is enough.
fn seconds(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}
