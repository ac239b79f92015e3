//! Identity key lifecycle on top of a [`KeyStore`]
//!
//! The manager owns the policy: a key pair is created once per identity,
//! reused on every later session, replaced only on explicit rotation, and
//! destroyed only on explicit reset. It never regenerates on its own when a
//! stored record is unreadable.

#![allow(clippy::disallowed_types, reason = "Per-identity locks around synchronous store calls")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use dchat_crypto::{KeyConfig, KeyPair, generate_key_pair};
use rand_core::CryptoRngCore;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    error::{KeyManagerError, StorageError},
    record::StoredKeyPair,
    store::KeyStore,
};

/// Loads, creates and replaces identity key pairs.
///
/// Holds only the injected store and the key configuration. Shareable across
/// threads by reference or `Arc`. Writers for one identity are serialized;
/// different identities never wait on each other.
pub struct KeyManager<S: KeyStore> {
    store: S,
    config: KeyConfig,
    /// One lock per identity that has been written through this manager
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: KeyStore> KeyManager<S> {
    /// Create a manager over `store` generating keys per `config`.
    ///
    /// # Errors
    ///
    /// - `KeyManagerError::Crypto(UnsupportedKeySize)` if `config` is out of range
    pub fn new(store: S, config: KeyConfig) -> Result<Self, KeyManagerError> {
        config.validate()?;
        Ok(Self { store, config, locks: Mutex::new(HashMap::new()) })
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configuration used for new key pairs.
    pub fn config(&self) -> &KeyConfig {
        &self.config
    }

    /// Read the stored key pair for `identity`.
    ///
    /// Takes no lock.
    ///
    /// # Errors
    ///
    /// - `KeyManagerError::Storage` if the store fails
    /// - `KeyManagerError::CorruptRecord` if a record exists but is unusable
    pub fn load(&self, identity: &str) -> Result<Option<KeyPair>, KeyManagerError> {
        let Some(bytes) = self.store.load(identity)? else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(bytes);

        let corrupt = |reason: String| KeyManagerError::CorruptRecord {
            identity: identity.to_owned(),
            reason,
        };
        let record = StoredKeyPair::decode(&bytes).map_err(|e| corrupt(e.to_string()))?;
        let key_pair = record.to_key_pair().map_err(|e| corrupt(e.to_string()))?;

        Ok(Some(key_pair))
    }

    /// Write `key_pair` as the record for `identity`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// - `KeyManagerError::Crypto` if the key pair cannot be encoded
    /// - `KeyManagerError::Storage` if the store fails
    pub fn persist(&self, identity: &str, key_pair: &KeyPair) -> Result<(), KeyManagerError> {
        let bytes = encode_record(key_pair)?;
        self.store.save(identity, &bytes)?;

        debug!(identity, "persisted key pair");
        Ok(())
    }

    /// Return the identity's key pair, creating and persisting one if absent.
    ///
    /// An existing pair is returned without locking. On a miss, callers for
    /// the same identity are serialized and the store is checked again before
    /// generating. If another writer sharing the store creates a record between
    /// that check and our write, its pair wins and is returned instead of ours.
    ///
    /// # Errors
    ///
    /// - `KeyManagerError::Storage` if the store fails
    /// - `KeyManagerError::CorruptRecord` if an existing record is unusable
    /// - `KeyManagerError::Crypto` if generation fails
    pub fn generate_or_load<R: CryptoRngCore>(
        &self,
        identity: &str,
        rng: &mut R,
    ) -> Result<KeyPair, KeyManagerError> {
        if let Some(existing) = self.load(identity)? {
            debug!(identity, "loaded existing key pair");
            return Ok(existing);
        }

        let lock = self.identity_lock(identity);
        let _guard = hold(&lock);

        if let Some(existing) = self.load(identity)? {
            debug!(identity, "key pair created while waiting");
            return Ok(existing);
        }

        let key_pair = generate_key_pair(rng, &self.config)?;
        let bytes = encode_record(&key_pair)?;

        if self.store.save_if_absent(identity, &bytes)? {
            info!(identity, bits = self.config.modulus_bits, "generated identity key pair");
            return Ok(key_pair);
        }

        warn!(identity, "key pair was created concurrently, discarding ours");
        self.load(identity)?.ok_or_else(|| {
            StorageError::Io(format!("record for `{identity}` vanished after concurrent creation"))
                .into()
        })
    }

    /// Replace the identity's key pair with a fresh one.
    ///
    /// Messages encrypted to the previous public key can no longer be read.
    ///
    /// # Errors
    ///
    /// - `KeyManagerError::Crypto` if generation fails
    /// - `KeyManagerError::Storage` if the store fails
    pub fn rotate<R: CryptoRngCore>(
        &self,
        identity: &str,
        rng: &mut R,
    ) -> Result<KeyPair, KeyManagerError> {
        let lock = self.identity_lock(identity);
        let _guard = hold(&lock);

        let key_pair = generate_key_pair(rng, &self.config)?;
        self.persist(identity, &key_pair)?;

        warn!(
            identity,
            bits = self.config.modulus_bits,
            "rotated identity key pair, history encrypted to the old key is unreadable"
        );
        Ok(key_pair)
    }

    /// Delete the identity's key pair.
    ///
    /// Returns `true` if a record existed.
    ///
    /// # Errors
    ///
    /// - `KeyManagerError::Storage` if the store fails
    pub fn reset(&self, identity: &str) -> Result<bool, KeyManagerError> {
        let lock = self.identity_lock(identity);
        let _guard = hold(&lock);

        let existed = self.store.delete(identity)?;
        info!(identity, existed, "reset identity key pair");
        Ok(existed)
    }

    fn identity_lock(&self, identity: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(identity.to_owned()).or_default())
    }
}

/// Lock an identity; poisoning is ignored since the lock guards no data.
fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

fn encode_record(key_pair: &KeyPair) -> Result<Zeroizing<Vec<u8>>, KeyManagerError> {
    let record = StoredKeyPair::from_key_pair(key_pair)?;
    Ok(Zeroizing::new(record.encode()?))
}
