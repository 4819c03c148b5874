//! In-memory storage backend implementation.
//!
//! [`MemoryBackend`] keeps every key in a [`BTreeMap`] behind a
//! [`parking_lot::RwLock`]. It backs the `memory` credential source and the
//! test suites.
//!
//! # Example
//!
//! ```
//! use keyward_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"greeting".to_vec(), b"hello".to_vec()).await.unwrap();
//!     let value = backend.get(b"greeting").await.unwrap();
//!
//!     assert_eq!(value.unwrap().as_ref(), b"hello");
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - No replication or distributed features

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
};

/// In-memory storage backend using [`BTreeMap`].
///
/// # Cloning
///
/// `MemoryBackend` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying data store.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
}

impl MemoryBackend {
    /// Creates a new, empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the backend holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    #[tracing::instrument(skip_all)]
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        let data = self.data.read();
        Ok(data.get(key).cloned())
    }

    #[tracing::instrument(skip_all, fields(value_len = value.len()))]
    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        let mut data = self.data.write();
        data.insert(key, Bytes::from(value));
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(insert_only = expected.is_none()))]
    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        let mut data = self.data.write();

        let matches = match (expected, data.get(key)) {
            (None, None) => true,
            (Some(exp), Some(cur)) => exp == &cur[..],
            _ => false,
        };

        if !matches {
            return Err(StorageError::conflict(String::from_utf8_lossy(key)));
        }

        data.insert(key.to_vec(), Bytes::from(new_value));
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        data.remove(key);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::assert_conflict;

    #[tokio::test]
    async fn test_basic_operations() {
        let backend = MemoryBackend::new();

        backend.set(b"key1".to_vec(), b"value1".to_vec()).await.unwrap();
        let value = backend.get(b"key1").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value1")));

        backend.delete(b"key1").await.unwrap();
        let value = backend.get(b"key1").await.unwrap();
        assert_eq!(value, None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let backend = MemoryBackend::new();
        backend.delete(b"never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_clone_shares_data() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();

        backend.set(b"shared".to_vec(), b"yes".to_vec()).await.unwrap();

        assert_eq!(clone.get(b"shared").await.unwrap(), Some(Bytes::from("yes")));
        assert_eq!(clone.len(), 1);
    }

    #[tokio::test]
    async fn test_compare_and_set_success() {
        let backend = MemoryBackend::new();
        backend.set(b"key".to_vec(), b"value1".to_vec()).await.unwrap();

        backend
            .compare_and_set(b"key", Some(b"value1".as_slice()), b"value2".to_vec())
            .await
            .unwrap();

        assert_eq!(backend.get(b"key").await.unwrap(), Some(Bytes::from("value2")));
    }

    #[tokio::test]
    async fn test_compare_and_set_conflict() {
        let backend = MemoryBackend::new();
        backend.set(b"key".to_vec(), b"value1".to_vec()).await.unwrap();

        let result =
            backend.compare_and_set(b"key", Some(b"wrong".as_slice()), b"value2".to_vec()).await;
        assert_conflict!(result);

        // Original value unchanged
        assert_eq!(backend.get(b"key").await.unwrap(), Some(Bytes::from("value1")));
    }

    #[tokio::test]
    async fn test_compare_and_set_insert_if_absent() {
        let backend = MemoryBackend::new();

        backend.compare_and_set(b"new_key", None, b"value".to_vec()).await.unwrap();
        assert_eq!(backend.get(b"new_key").await.unwrap(), Some(Bytes::from("value")));

        let second = backend.compare_and_set(b"new_key", None, b"other".to_vec()).await;
        assert_conflict!(second, "insert-if-absent must not overwrite");
    }

    #[tokio::test]
    async fn test_compare_and_set_missing_key_with_expected_some() {
        let backend = MemoryBackend::new();

        let result =
            backend.compare_and_set(b"missing", Some(b"value".as_slice()), b"new".to_vec()).await;
        assert_conflict!(result);
        assert!(backend.get(b"missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_insert_if_absent_has_single_winner() {
        let backend = MemoryBackend::new();

        let mut handles = Vec::new();
        for task in 0..16u8 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.compare_and_set(b"contended", None, vec![task]).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one insert-if-absent may succeed");
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(MemoryBackend::new().health_check().await.is_ok());
    }
}
