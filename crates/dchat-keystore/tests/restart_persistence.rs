//! Persistence tests for `RedbKeyStore` behind a `KeyManager`.
//!
//! These tests verify that key pairs survive database close/reopen cycles,
//! simulating application restarts, and that concurrent first use of an
//! identity settles on a single key pair.

use std::{sync::Arc, thread};

use dchat_crypto::{KeyConfig, decrypt, encrypt, export_public_key};
use dchat_keystore::{KeyManager, KeyManagerError, KeyStore, MemoryKeyStore, RedbKeyStore};
use rand::{SeedableRng, rngs::OsRng};
use rand_chacha::ChaCha20Rng;
use tempfile::tempdir;

#[test]
fn key_pair_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("keys.redb");

    // First session creates the key and receives a message
    let (public_pem, envelope) = {
        let manager = KeyManager::new(RedbKeyStore::open(&db_path).unwrap(), KeyConfig::default())
            .unwrap();
        let key_pair =
            manager.generate_or_load("0xalice", &mut ChaCha20Rng::seed_from_u64(41)).unwrap();

        let pem = export_public_key(&key_pair).unwrap();
        let envelope = encrypt("sent before restart", &pem, &mut OsRng).unwrap();
        (pem, envelope)

        // Database dropped
    };

    // Second session loads the same key and reads the old message
    {
        let manager = KeyManager::new(RedbKeyStore::open(&db_path).unwrap(), KeyConfig::default())
            .unwrap();
        let key_pair =
            manager.generate_or_load("0xalice", &mut ChaCha20Rng::seed_from_u64(42)).unwrap();

        assert_eq!(export_public_key(&key_pair).unwrap(), public_pem);
        assert_eq!(decrypt(&envelope, &key_pair).unwrap(), "sent before restart");
    }
}

#[test]
fn reset_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("keys.redb");

    {
        let manager = KeyManager::new(RedbKeyStore::open(&db_path).unwrap(), KeyConfig::default())
            .unwrap();
        manager.generate_or_load("0xalice", &mut ChaCha20Rng::seed_from_u64(43)).unwrap();
        assert!(manager.reset("0xalice").unwrap());
    }

    {
        let store = RedbKeyStore::open(&db_path).unwrap();
        assert_eq!(store.load("0xalice").unwrap(), None);
    }
}

#[test]
fn corrupt_record_after_restart_is_reported() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("keys.redb");

    {
        let store = RedbKeyStore::open(&db_path).unwrap();
        store.save("0xalice", &[0xA5; 64]).unwrap();
    }

    let manager =
        KeyManager::new(RedbKeyStore::open(&db_path).unwrap(), KeyConfig::default()).unwrap();

    assert!(matches!(
        manager.load("0xalice"),
        Err(KeyManagerError::CorruptRecord { ref identity, .. }) if identity == "0xalice"
    ));
}

#[test]
fn concurrent_first_use_yields_one_key_pair() {
    let manager = Arc::new(KeyManager::new(MemoryKeyStore::new(), KeyConfig::default()).unwrap());

    let handles: Vec<_> = (0..8u64)
        .map(|seed| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let key_pair = manager
                    .generate_or_load("0xalice", &mut ChaCha20Rng::seed_from_u64(100 + seed))
                    .unwrap();
                export_public_key(&key_pair).unwrap()
            })
        })
        .collect();

    let pems: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(pems.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(manager.store().len(), 1);
}

#[test]
fn separate_managers_sharing_a_store_agree() {
    // Two managers stand in for two processes: each has its own generation
    // lock, so only the store's atomic insert can decide the winner.
    let dir = tempdir().unwrap();
    let store = RedbKeyStore::open(dir.path().join("keys.redb")).unwrap();

    let handles: Vec<_> = (0..2u64)
        .map(|seed| {
            let store = store.clone();
            thread::spawn(move || {
                let manager = KeyManager::new(store, KeyConfig::default()).unwrap();
                let key_pair = manager
                    .generate_or_load("0xbob", &mut ChaCha20Rng::seed_from_u64(200 + seed))
                    .unwrap();
                export_public_key(&key_pair).unwrap()
            })
        })
        .collect();

    let pems: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(pems[0], pems[1]);
}
