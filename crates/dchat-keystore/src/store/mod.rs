//! Storage abstraction for identity key records
//!
//! A byte-oriented key-value interface keyed by identity (for the web product,
//! the wallet address). The trait is synchronous; every implementation here is
//! either in-memory or a local embedded database.

mod chaotic;
mod memory;
mod redb;

pub use chaotic::ChaoticKeyStore;
pub use memory::MemoryKeyStore;

pub use self::redb::RedbKeyStore;
use crate::error::StorageError;

/// Persistence for key records, one record per identity.
///
/// Must be Clone (shared between managers and threads), Send + Sync, and
/// synchronous. Implementations share internal state via Arc, so clones access
/// the same underlying storage.
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Load the record for `identity`.
    ///
    /// Returns `None` if nothing has been stored yet.
    fn load(&self, identity: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store the record for `identity`, replacing any existing one.
    fn save(&self, identity: &str, record: &[u8]) -> Result<(), StorageError>;

    /// Store the record only if `identity` has none.
    ///
    /// # Invariants
    ///
    /// - The existence check and the write are a single atomic step
    /// - Returns `true` if this call wrote the record, `false` if one existed
    fn save_if_absent(&self, identity: &str, record: &[u8]) -> Result<bool, StorageError>;

    /// Remove the record for `identity`.
    ///
    /// Returns `true` if a record existed.
    fn delete(&self, identity: &str) -> Result<bool, StorageError>;
}
