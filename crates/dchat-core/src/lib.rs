//! Dchat end-to-end encryption service.
//!
//! [`E2eService`] is the surface the rest of the application talks to. It
//! composes the hybrid cipher from [`dchat_crypto`] with the key lifecycle
//! from [`dchat_keystore`]:
//!
//! - [`E2eService::generate_or_load_key_pair`]
//! - [`E2eService::export_public_key`]
//! - [`E2eService::encrypt_for_recipient`]
//! - [`E2eService::decrypt_envelope`]
//!
//! # Publishing
//!
//! The send flow uploads the envelope JSON to a content-addressed store and
//! anchors its digest elsewhere. [`E2eService::publish`] and
//! [`E2eService::retrieve`] cover the store half through the [`ContentStore`]
//! trait. A store that could only keep a local copy is reported as
//! [`ServiceError::StorageDegraded`], never as success.
//!
//! # Logging
//!
//! Uses `tracing`. Events carry identities, sizes, digests and content
//! references only. Plaintext, keys and envelope fields are never logged.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod content;
mod error;
mod service;

pub use content::{ContentStore, Durability, MemoryContentStore, PublishedMessage, StoreReceipt};
pub use error::ServiceError;
pub use service::E2eService;
