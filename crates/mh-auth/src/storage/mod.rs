pub mod error;
pub mod file_store;
pub(crate) mod json_map;
pub mod key_value_store;
pub mod memory_store;
