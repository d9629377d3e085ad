use crate::storage::json_map::JsonMap;
use crate::{Identity, KeyValueStore, Pin, Result as AuthErrorResult};

use std::sync::Arc;

const PIN_CACHE_KEY: &str = "munro_pins";

/// Plaintext PIN cache backing the offline fallback.
///
/// Only populated after the backend has accepted a PIN.
pub struct LocalPinCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalPinCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn contains(&self, identity: Identity) -> AuthErrorResult<bool> {
        let pins = self.map().load::<String>()?;
        Ok(pins.contains_key(identity.as_str()))
    }

    pub fn matches(&self, identity: Identity, pin: &Pin) -> AuthErrorResult<bool> {
        let pins = self.map().load::<String>()?;
        Ok(pins
            .get(identity.as_str())
            .is_some_and(|cached| cached == pin.expose()))
    }

    pub fn remember(&self, identity: Identity, pin: &Pin) -> AuthErrorResult<()> {
        let map = self.map();
        let mut pins = map.load::<String>()?;
        pins.insert(identity.as_str().to_string(), pin.expose().to_string());
        map.save(&pins)?;
        Ok(())
    }

    pub fn forget(&self, identity: Identity) -> AuthErrorResult<()> {
        let map = self.map();
        let mut pins = map.load::<String>()?;
        if pins.remove(identity.as_str()).is_some() {
            map.save(&pins)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> AuthErrorResult<()> {
        self.map().clear()?;
        Ok(())
    }

    fn map(&self) -> JsonMap<'_> {
        JsonMap::new(self.store.as_ref(), PIN_CACHE_KEY)
    }
}
