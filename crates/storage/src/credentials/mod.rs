//! Principals and the stores that resolve them.
//!
//! - [`Principal`]: identifier plus salted password hash
//! - [`CredentialStore`]: the lookup trait the authenticator consumes
//! - [`StaticCredentialStore`]: read-only table loaded from configuration
//! - [`BackendCredentialStore`]: provisioning and lookup over a
//!   [`StorageBackend`](crate::StorageBackend)

mod backend_store;
mod principal;
mod store;

pub use backend_store::{BackendCredentialStore, USER_KEY_PREFIX};
pub use principal::Principal;
pub use store::{CredentialStore, StaticCredentialStore};
