//! Content digests for referencing envelopes
//!
//! SHA-256 over the exact input bytes. Digests are opaque references (the
//! product anchors them on chain next to the content-store reference); they
//! are never a decryption input.

use std::{fmt, str::FromStr};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{envelope::EncryptedEnvelope, error::CryptoError};

/// Digest size in bytes (SHA-256).
pub const DIGEST_SIZE: usize = 32;

/// A SHA-256 digest. Displays as 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; DIGEST_SIZE]);

impl ContentDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|e| CryptoError::UnsupportedInput {
            reason: format!("invalid digest hex: {e}"),
        })?;
        Ok(Self(bytes))
    }
}

/// Digest arbitrary bytes or text (text is hashed as its UTF-8 bytes).
pub fn digest(content: impl AsRef<[u8]>) -> ContentDigest {
    ContentDigest(Sha256::digest(content.as_ref()).into())
}

/// Hex digest of arbitrary bytes or text.
pub fn digest_hex(content: impl AsRef<[u8]>) -> String {
    digest(content).to_hex()
}

/// Digest the compact JSON serialization of `value`.
///
/// # Errors
///
/// - `UnsupportedInput`: `value` cannot be serialized (e.g. a map with
///   non-string keys)
pub fn digest_serialized<T: Serialize + ?Sized>(value: &T) -> Result<ContentDigest, CryptoError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| CryptoError::UnsupportedInput { reason: e.to_string() })?;
    Ok(digest(bytes))
}

/// Digest of an envelope's canonical wire JSON.
pub fn digest_envelope(envelope: &EncryptedEnvelope) -> ContentDigest {
    digest(envelope.to_json())
}
