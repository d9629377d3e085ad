pub mod attempt_tracker;
pub mod auth_bridge_context;
pub mod auth_provider;
pub mod bridge_settings;
pub mod error;
pub mod identity;
pub mod local_fallback_pin_backend;
pub mod local_pin_cache;
pub mod offline_backend;
pub mod pin;
pub mod pin_backend;
pub mod pin_status;
pub mod pin_verifier;
pub mod profile;
pub mod profile_store;
pub mod remote_pin_backend;
pub mod session;
pub mod session_store;
pub mod storage;
pub mod submit_outcome;
pub mod unlock_machine;
pub mod unlock_phase;
pub mod unlock_state;
pub mod verify_result;

pub use attempt_tracker::AttemptTracker;
pub use auth_bridge_context::AuthBridgeContext;
pub use auth_provider::AuthProvider;
pub use bridge_settings::BridgeSettings;
pub use error::{AuthError, Result};
pub use identity::Identity;
pub use local_fallback_pin_backend::LocalFallbackPinBackend;
pub use local_pin_cache::LocalPinCache;
pub use offline_backend::OfflineBackend;
pub use pin::{MAX_PIN_LENGTH, MIN_PIN_LENGTH, Pin};
pub use pin_backend::{PinBackend, PinCheck, VerificationSource};
pub use pin_status::PinStatus;
pub use pin_verifier::PinVerifier;
pub use profile::Profile;
pub use profile_store::ProfileStore;
pub use remote_pin_backend::RemotePinBackend;
pub use session::{Session, StoredSession};
pub use session_store::SessionStore;
pub use storage::error::{Result as StorageResult, StorageError};
pub use storage::file_store::FileKeyValueStore;
pub use storage::key_value_store::KeyValueStore;
pub use storage::memory_store::MemoryKeyValueStore;
pub use submit_outcome::SubmitOutcome;
pub use unlock_machine::{UnlockListener, UnlockMachine};
pub use unlock_phase::{CreationStep, FailureReason, Phase};
pub use unlock_state::UnlockState;
pub use verify_result::VerifyResult;

#[cfg(test)]
mod tests;
