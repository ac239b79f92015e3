//! Identity key persistence for Dchat.
//!
//! Each identity (a wallet address in the web product) owns one long-lived
//! key pair. This crate stores it behind the injected [`KeyStore`] interface
//! and enforces its lifecycle through [`KeyManager`]:
//!
//! - created on first use and persisted before it is handed out
//! - loaded unchanged on every later session
//! - replaced only by an explicit [`KeyManager::rotate`]
//! - destroyed only by an explicit [`KeyManager::reset`]
//!
//! # Storage back-ends
//!
//! - [`MemoryKeyStore`]: in-process, zeroizing values (tests, embedding)
//! - [`RedbKeyStore`]: durable single-file database with ACID transactions
//! - [`ChaoticKeyStore`]: wraps another store and injects I/O failures
//!
//! # Record format
//!
//! [`StoredKeyPair`] is a versioned CBOR map holding the public key PEM and the
//! PKCS#8 private key. A record whose private half does not reproduce the
//! stored public half is reported as [`KeyManagerError::CorruptRecord`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod manager;
mod record;
pub mod store;

pub use error::{KeyManagerError, RecordError, StorageError};
pub use manager::KeyManager;
pub use record::{RECORD_VERSION, StoredKeyPair};
pub use store::{ChaoticKeyStore, KeyStore, MemoryKeyStore, RedbKeyStore};
