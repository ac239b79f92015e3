#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use zeroize::Zeroizing;

use super::{KeyStore, StorageError};

/// In-memory key store for testing and embedding
///
/// Records are held in zeroizing buffers, so overwritten and deleted private
/// keys are wiped rather than left in freed memory. Thread-safe through Mutex,
/// but uses `lock().expect()` which will panic if the mutex is poisoned -
/// acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    records: Arc<Mutex<HashMap<String, Zeroizing<Vec<u8>>>>>,
}

impl MemoryKeyStore {
    /// Create a new empty `MemoryKeyStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities with a stored record.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.records.lock().expect("Mutex poisoned").len()
    }

    /// True if no identity has a stored record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn load(&self, identity: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let records = self.records.lock().expect("Mutex poisoned");

        Ok(records.get(identity).map(|record| record.to_vec()))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn save(&self, identity: &str, record: &[u8]) -> Result<(), StorageError> {
        self.records
            .lock()
            .expect("Mutex poisoned")
            .insert(identity.to_owned(), Zeroizing::new(record.to_vec()));

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn save_if_absent(&self, identity: &str, record: &[u8]) -> Result<bool, StorageError> {
        let mut records = self.records.lock().expect("Mutex poisoned");

        if records.contains_key(identity) {
            return Ok(false);
        }
        records.insert(identity.to_owned(), Zeroizing::new(record.to_vec()));

        Ok(true)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn delete(&self, identity: &str) -> Result<bool, StorageError> {
        Ok(self.records.lock().expect("Mutex poisoned").remove(identity).is_some())
    }
}
