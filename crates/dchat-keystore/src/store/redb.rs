//! Redb-backed durable key store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. A
//! record is either fully written or absent after a crash, never torn.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};

use super::{KeyStore, StorageError};

/// Table: key_pairs
/// Key: identity (UTF-8)
/// Value: CBOR-encoded StoredKeyPair
const KEY_PAIRS: TableDefinition<&str, &[u8]> = TableDefinition::new("key_pairs");

/// Durable key store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc). Redb
/// serializes write transactions, which makes `save_if_absent` atomic across
/// threads sharing the database.
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the KEY_PAIRS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(KEY_PAIRS).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyStore for RedbKeyStore {
    fn load(&self, identity: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;

        let table = txn.open_table(KEY_PAIRS).map_err(|e| StorageError::Io(e.to_string()))?;

        let value = table.get(identity).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(value.map(|record| record.value().to_vec()))
    }

    fn save(&self, identity: &str, record: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(KEY_PAIRS).map_err(|e| StorageError::Io(e.to_string()))?;
            table.insert(identity, record).map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn save_if_absent(&self, identity: &str, record: &[u8]) -> Result<bool, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let written = {
            let mut table =
                txn.open_table(KEY_PAIRS).map_err(|e| StorageError::Io(e.to_string()))?;

            let exists =
                table.get(identity).map_err(|e| StorageError::Io(e.to_string()))?.is_some();
            if !exists {
                table.insert(identity, record).map_err(|e| StorageError::Io(e.to_string()))?;
            }
            !exists
        };

        if written {
            txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;
        } else {
            txn.abort().map_err(|e| StorageError::Io(e.to_string()))?;
        }

        Ok(written)
    }

    fn delete(&self, identity: &str) -> Result<bool, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let existed = {
            let mut table =
                txn.open_table(KEY_PAIRS).map_err(|e| StorageError::Io(e.to_string()))?;
            table.remove(identity).map_err(|e| StorageError::Io(e.to_string()))?.is_some()
        };

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(existed)
    }
}
