//! Content publication seam
//!
//! Senders upload the envelope JSON to a content-addressed store and anchor
//! the envelope digest next to the returned reference. The store itself (a
//! pinning gateway in the web product) lives outside this crate; it is reached
//! through [`ContentStore`].

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use dchat_crypto::{ContentDigest, EncryptedEnvelope, digest_hex};
use dchat_keystore::StorageError;

/// How durably a store kept an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Pinned in the shared store, fetchable by other parties
    Pinned,
    /// Kept only in local fallback storage after the pin failed
    LocalFallback,
}

/// Result of a successful [`ContentStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    /// Reference to fetch the content by
    pub content_ref: String,
    /// Where the content ended up
    pub durability: Durability,
}

/// A content-addressed blob store.
pub trait ContentStore: Send + Sync {
    /// Upload `bytes` and return where they were stored.
    fn put(&self, bytes: &[u8]) -> Result<StoreReceipt, StorageError>;

    /// Fetch content by reference. `None` if nothing is stored under it.
    fn get(&self, content_ref: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// An envelope as published: what to anchor, and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// The encrypted message
    pub envelope: EncryptedEnvelope,
    /// Digest of the envelope's wire JSON
    pub digest: ContentDigest,
    /// Store reference of the uploaded JSON
    pub content_ref: String,
}

/// In-memory content store.
///
/// References are `mem:` followed by the SHA-256 hex of the content. Degraded
/// mode emulates a failed pin: uploads still succeed and stay fetchable, but
/// the receipt reports [`Durability::LocalFallback`].
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    degraded: Arc<AtomicBool>,
}

impl MemoryContentStore {
    /// Create a new empty store in pinned mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch degraded mode on or off.
    pub fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::SeqCst);
    }

    /// Replace the bytes stored under `content_ref`.
    ///
    /// Models a gateway serving different content than was uploaded.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn overwrite(&self, content_ref: &str, bytes: Vec<u8>) {
        self.blobs.lock().expect("Mutex poisoned").insert(content_ref.to_owned(), bytes);
    }
}

impl ContentStore for MemoryContentStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn put(&self, bytes: &[u8]) -> Result<StoreReceipt, StorageError> {
        let content_ref = format!("mem:{}", digest_hex(bytes));
        self.blobs.lock().expect("Mutex poisoned").insert(content_ref.clone(), bytes.to_vec());

        let durability = if self.degraded.load(Ordering::SeqCst) {
            Durability::LocalFallback
        } else {
            Durability::Pinned
        };

        Ok(StoreReceipt { content_ref, durability })
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn get(&self, content_ref: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.lock().expect("Mutex poisoned").get(content_ref).cloned())
    }
}
