use crate::StorageResult;

/// Client-local persistent key-value storage.
///
/// Values are opaque strings; callers store JSON documents in them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
