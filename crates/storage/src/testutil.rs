//! Shared test utilities for storage and credential store testing.
//!
//! This module provides principal factories, fault-injecting backends and
//! assertion macros for [`StorageResult`] values. It is feature-gated behind
//! `testutil` to keep it out of production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! keyward-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use keyward_storage::testutil::{FailingBackend, make_principal};
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    StorageBackend,
    credentials::Principal,
    error::{StorageError, StorageResult},
    memory::MemoryBackend,
};

/// Builds a principal with a fixed creation time of "now".
#[must_use]
pub fn make_principal(id: &str, password_hash: &str) -> Principal {
    Principal::builder().id(id).password_hash(password_hash.to_owned()).build()
}

/// Backend whose every operation fails with [`StorageError::Connection`].
///
/// Simulates a database that is down.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend;

impl FailingBackend {
    /// Creates a new failing backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn unavailable<T>() -> StorageResult<T> {
        Err(StorageError::connection("injected failure: backend unavailable"))
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    async fn get(&self, _key: &[u8]) -> StorageResult<Option<Bytes>> {
        Self::unavailable()
    }

    async fn set(&self, _key: Vec<u8>, _value: Vec<u8>) -> StorageResult<()> {
        Self::unavailable()
    }

    async fn compare_and_set(
        &self,
        _key: &[u8],
        _expected: Option<&[u8]>,
        _new_value: Vec<u8>,
    ) -> StorageResult<()> {
        Self::unavailable()
    }

    async fn delete(&self, _key: &[u8]) -> StorageResult<()> {
        Self::unavailable()
    }

    async fn health_check(&self) -> StorageResult<()> {
        Self::unavailable()
    }
}

/// Backend that sleeps before every read, then delegates to a
/// [`MemoryBackend`].
///
/// Writes are not delayed so tests can seed data quickly. Pair with
/// `tokio::time::pause()` to exercise deadlines without real waiting.
#[derive(Debug, Clone)]
pub struct StalledBackend {
    inner: MemoryBackend,
    delay: Duration,
}

impl StalledBackend {
    /// Wraps `inner`, delaying each read by `delay`.
    #[must_use]
    pub fn new(inner: MemoryBackend, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl StorageBackend for StalledBackend {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(key, value).await
    }

    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        self.inner.compare_and_set(key, expected, new_value).await
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.health_check().await
    }
}

/// Assert that a [`StorageResult`] is a [`StorageError::Conflict`].
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use keyward_storage::{StorageError, StorageResult, assert_conflict};
///
/// let result: StorageResult<()> = Err(StorageError::conflict("users/a"));
/// assert_conflict!(result);
/// ```
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {
        $crate::assert_conflict!($result, "assertion failed")
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Err($crate::error::StorageError::Conflict { .. }) => {},
            other => panic!("{}: expected StorageError::Conflict, got: {:?}", $msg, other),
        }
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::NotFound`].
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        $crate::assert_not_found!($result, "assertion failed")
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Err($crate::error::StorageError::NotFound { .. }) => {},
            other => panic!("{}: expected StorageError::NotFound, got: {:?}", $msg, other),
        }
    };
}

/// Assert that a [`StorageResult`] is `Ok` and return the inner value.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}
