//! Hosted backend collaborator for the authentication bridge.

pub(crate) mod client;
pub(crate) mod error;
pub(crate) mod profile_row;
pub(crate) mod token_response;


pub use client::SupabaseClient;
pub use error::{ClientError, Result as SupabaseResult};
