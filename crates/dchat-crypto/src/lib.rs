//! Dchat Cryptographic Primitives
//!
//! Hybrid end-to-end encryption for chat messages. Pure functions: callers
//! provide the random number generator, so tests can pin every byte.
//!
//! # Message Flow
//!
//! Each message gets its own content key. The content key encrypts the text,
//! and the recipient's long-lived RSA key wraps the content key.
//!
//! ```text
//! plaintext
//!     │
//!     ▼
//! AES-256-GCM (fresh 32-byte key, fresh 12-byte nonce)
//!     │                         │
//!     ▼                         ▼
//! ciphertext ‖ tag      RSA-OAEP-SHA256(recipient public key)
//!     │                         │
//!     ▼                         ▼
//! EncryptedEnvelope { ciphertext, encryptedKey, iv }  (base64 fields)
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - Content keys are drawn per call and never reused
//! - Only the holder of the matching private key can unwrap the content key
//!
//! Integrity:
//! - AES-GCM tag covers the ciphertext; any modification fails decryption
//! - No unauthenticated fallback exists
//!
//! Key hygiene:
//! - Private keys and content keys are zeroized on drop
//! - Private keys leave the process only as PKCS#8 handed to persistence
//!
//! Known limitation:
//! - RSA decryption in `rsa` 0.9 is not constant time (RUSTSEC-2023-0071,
//!   "Marvin"). [`decrypt`] unwraps attacker-supplied keys, so an attacker who
//!   can submit many envelopes and measure decryption timing precisely may
//!   recover the private key. Do not expose decryption as a remotely timeable
//!   oracle.
//!
//! # Interoperability
//!
//! Algorithms and encodings match the browser client (Web Crypto RSA-OAEP
//! with SHA-256, AES-GCM with a 12-byte IV, SPKI PEM public keys), so
//! envelopes and exported keys are exchangeable with it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
mod digest;
mod envelope;
mod error;
mod keys;
pub mod pem;
#[cfg(test)]
mod testing;

pub use cipher::{decrypt, decrypt_bytes, encrypt, encrypt_for_key};
pub use digest::{
    ContentDigest, DIGEST_SIZE, digest, digest_envelope, digest_hex, digest_serialized,
};
pub use envelope::{
    CONTENT_KEY_SIZE, EncryptedEnvelope, FIELD_CIPHERTEXT, FIELD_ENCRYPTED_KEY, FIELD_IV,
    NONCE_SIZE, TAG_SIZE,
};
pub use error::CryptoError;
pub use keys::{
    KeyConfig, KeyPair, MAX_MODULUS_BITS, MIN_MODULUS_BITS, PUBLIC_KEY_LABEL, PublicKey,
    export_public_key, generate_key_pair, import_public_key,
};
