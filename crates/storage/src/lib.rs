//! Storage backend abstraction and credential stores for Keyward.
//!
//! This crate provides the [`StorageBackend`] key-value trait and the
//! [`CredentialStore`](credentials::CredentialStore) abstraction the
//! authenticator uses to resolve principals.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                keyward-authn (Authenticator)             │
//! ├──────────────────────────────────────────────────────────┤
//! │                 CredentialStore trait                    │
//! ├──────────────────────────┬───────────────────────────────┤
//! │  StaticCredentialStore   │   BackendCredentialStore<B>   │
//! │  (config, read-only)     │   (create/get/delete user)    │
//! │                          ├───────────────────────────────┤
//! │                          │   StorageBackend trait        │
//! │                          │   (MemoryBackend, ...)        │
//! └──────────────────────────┴───────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use keyward_storage::{
//!     MemoryBackend,
//!     credentials::{BackendCredentialStore, CredentialStore, Principal},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = BackendCredentialStore::new(MemoryBackend::new());
//!     let principal =
//!         Principal::builder().id("email1").password_hash("aGFzaA==".to_owned()).build();
//!
//!     store.create_user(&principal).await?;
//!     assert!(store.lookup("email1").await?.is_some());
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with principal factories, fault-injecting
//!   backends and assertion macros. Enable this in `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod credentials;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;

// Re-export primary types at crate root for convenience
pub use backend::StorageBackend;
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use zeroize::Zeroizing;
