//! Credential lookup trait and the static, configuration-loaded store.
//!
//! [`CredentialStore`] resolves a principal identifier to its stored
//! [`Principal`]. Lookups have three outcomes, and callers must keep them apart:
//!
//! | Result | Meaning |
//! |--------|---------|
//! | `Ok(Some(principal))` | The principal exists |
//! | `Ok(None)` | No such principal |
//! | `Err(StorageError)` | The store could not answer (see [`StorageError::is_transient`]) |
//!
//! A missing principal is a normal answer. It must never be reported as an
//! error, and an unreachable store must never be reported as `Ok(None)`.
//!
//! [`StorageError::is_transient`]: crate::StorageError::is_transient

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;

use crate::{credentials::Principal, error::StorageResult};

/// Resolves principal identifiers to stored credentials.
///
/// Implemented by [`StaticCredentialStore`] (read-only table from
/// configuration) and [`BackendCredentialStore`](super::BackendCredentialStore)
/// (delegates to a [`StorageBackend`](crate::StorageBackend)). The two are
/// interchangeable behind `Arc<dyn CredentialStore>`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up a principal by identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::StorageError) only when the store is
    /// unable to answer. An unknown identifier yields `Ok(None)`.
    async fn lookup(&self, principal_id: &str) -> StorageResult<Option<Principal>>;

    /// Checks that the store can serve lookups.
    ///
    /// The default implementation always succeeds, which is correct for
    /// stores with no external dependency.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    async fn lookup(&self, principal_id: &str) -> StorageResult<Option<Principal>> {
        (**self).lookup(principal_id).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        (**self).health_check().await
    }
}

/// Immutable identifier → principal table, built once at startup.
///
/// No locking is involved: the map is never written after construction, so
/// concurrent lookups only take shared references.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use keyward_storage::credentials::{CredentialStore, StaticCredentialStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut users = HashMap::new();
///     users.insert("email1".to_owned(), "c2FsdGVkLWhhc2g=".to_owned());
///
///     let store = StaticCredentialStore::from_map(users);
///
///     assert!(store.lookup("email1").await?.is_some());
///     assert!(store.lookup("nobody").await?.is_none());
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct StaticCredentialStore {
    principals: HashMap<String, Principal>,
}

impl StaticCredentialStore {
    /// Creates an empty store. Every lookup answers `Ok(None)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the store from an identifier → password hash map, the shape
    /// used by the `users` section of the configuration file.
    #[must_use]
    pub fn from_map(users: HashMap<String, String>) -> Self {
        users.into_iter().collect()
    }

    /// Builds the store from already-constructed principals.
    ///
    /// When two principals share an identifier the later one wins.
    #[must_use]
    pub fn from_principals(principals: impl IntoIterator<Item = Principal>) -> Self {
        Self { principals: principals.into_iter().map(|p| (p.id.clone(), p)).collect() }
    }

    /// Number of principals in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticCredentialStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_principals(iter.into_iter().map(|(id, hash)| {
            let hash: String = hash.into();
            Principal::builder().id(id).password_hash(hash).build()
        }))
    }
}

impl fmt::Debug for StaticCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialStore").field("principals", &self.principals.len()).finish()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, principal_id: &str) -> StorageResult<Option<Principal>> {
        Ok(self.principals.get(principal_id).cloned())
    }
}
