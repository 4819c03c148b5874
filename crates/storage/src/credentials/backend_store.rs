//! Credential store delegating to a [`StorageBackend`].
//!
//! Principals are serialized as JSON and stored at `users/{id}`. The
//! identifier is the storage key, so it is unique by construction, and
//! [`create_user`](BackendCredentialStore::create_user) writes with
//! insert-if-absent semantics. Two concurrent registrations of the same
//! identifier therefore resolve to exactly one winner. The loser gets
//! [`StorageError::Conflict`].

use async_trait::async_trait;

use crate::{
    backend::StorageBackend,
    credentials::{CredentialStore, Principal},
    error::{StorageError, StorageResult},
};

/// Storage key prefix for principal records.
pub const USER_KEY_PREFIX: &str = "users/";

/// [`CredentialStore`] over any [`StorageBackend`].
///
/// # Examples
///
/// ```
/// use keyward_storage::{
///     MemoryBackend,
///     credentials::{BackendCredentialStore, CredentialStore, Principal},
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = BackendCredentialStore::new(MemoryBackend::new());
///
///     let alice =
///         Principal::builder().id("alice@example.com").password_hash("aGFzaA==".to_owned()).build();
///     let id = store.create_user(&alice).await?;
///     assert_eq!(id, "alice@example.com");
///
///     assert!(store.lookup("alice@example.com").await?.is_some());
///     // A second registration under the same identifier is refused.
///     assert!(store.create_user(&alice).await.is_err());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BackendCredentialStore<B> {
    backend: B,
}

impl<B: StorageBackend> BackendCredentialStore<B> {
    /// Wraps a storage backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn user_key(id: &str) -> Vec<u8> {
        format!("{USER_KEY_PREFIX}{id}").into_bytes()
    }

    /// Provisions a principal and returns its identifier.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if the identifier is already registered
    /// - [`StorageError::Serialization`] if the record cannot be encoded
    /// - any backend error, unchanged
    #[tracing::instrument(skip(self, principal), fields(principal_id = %principal.id))]
    pub async fn create_user(&self, principal: &Principal) -> StorageResult<String> {
        let value = serde_json::to_vec(principal).map_err(|e| {
            StorageError::serialization_with_source("Failed to encode principal", e)
        })?;

        match self.backend.compare_and_set(&Self::user_key(&principal.id), None, value).await {
            Ok(()) => Ok(principal.id.clone()),
            Err(StorageError::Conflict { .. }) => Err(StorageError::conflict(format!(
                "Principal already exists: {}",
                principal.id
            ))),
            Err(e) => Err(e),
        }
    }

    /// Fetches a principal by email.
    ///
    /// Unlike [`lookup`](CredentialStore::lookup) this reports a missing
    /// principal as an error, which suits provisioning tools that expect
    /// the record to exist.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no principal has this identifier
    /// - [`StorageError::Serialization`] if the stored record is corrupt
    /// - any backend error, unchanged
    #[tracing::instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> StorageResult<Principal> {
        let key = Self::user_key(email);
        let Some(bytes) = self.backend.get(&key).await? else {
            return Err(StorageError::not_found(String::from_utf8_lossy(&key)));
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::serialization_with_source(
                format!("Failed to decode principal record for {email}"),
                e,
            )
        })
    }

    /// Removes a principal. Outstanding tokens stay valid until they expire.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no principal has this identifier
    /// - any backend error, unchanged
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, email: &str) -> StorageResult<()> {
        let key = Self::user_key(email);
        if self.backend.get(&key).await?.is_none() {
            return Err(StorageError::not_found(String::from_utf8_lossy(&key)));
        }
        self.backend.delete(&key).await
    }
}

#[async_trait]
impl<B: StorageBackend> CredentialStore for BackendCredentialStore<B> {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, principal_id: &str) -> StorageResult<Option<Principal>> {
        match self.get_user_by_email(principal_id).await {
            Ok(principal) => Ok(Some(principal)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.backend.health_check().await
    }
}
