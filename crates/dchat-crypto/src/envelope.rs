//! Wire/storage unit for one encrypted message
//!
//! Serialized as a flat JSON object with exactly three base64 text fields:
//!
//! ```text
//! { "ciphertext": "...", "encryptedKey": "...", "iv": "..." }
//! ```
//!
//! `ciphertext` carries the AES-GCM output with its 16-byte tag appended,
//! `encryptedKey` the RSA-OAEP wrapped content key, `iv` the 12-byte nonce.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// AES-GCM nonce size (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// AES-256 content key size (32 bytes)
pub const CONTENT_KEY_SIZE: usize = 32;

/// AES-GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Wire name of the ciphertext field.
pub const FIELD_CIPHERTEXT: &str = "ciphertext";
/// Wire name of the wrapped key field.
pub const FIELD_ENCRYPTED_KEY: &str = "encryptedKey";
/// Wire name of the nonce field.
pub const FIELD_IV: &str = "iv";

/// One encrypted message.
///
/// Read-only once built. Fields are kept in their text encoding so an envelope
/// can be relayed and stored without re-encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptedEnvelope {
    // Older web clients named this field `encryptedMessage`
    #[serde(alias = "encryptedMessage")]
    ciphertext: String,
    encrypted_key: String,
    iv: String,
}

/// Raw bytes of an envelope after base64 decoding.
pub(crate) struct DecodedEnvelope {
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) wrapped_key: Vec<u8>,
    pub(crate) nonce: [u8; NONCE_SIZE],
}

impl EncryptedEnvelope {
    /// Assemble an envelope from already-encoded fields.
    ///
    /// No validation happens here; [`crate::decrypt`] checks every field.
    pub fn from_parts(
        ciphertext: impl Into<String>,
        encrypted_key: impl Into<String>,
        iv: impl Into<String>,
    ) -> Self {
        Self { ciphertext: ciphertext.into(), encrypted_key: encrypted_key.into(), iv: iv.into() }
    }

    pub(crate) fn encode(ciphertext: &[u8], wrapped_key: &[u8], nonce: &[u8; NONCE_SIZE]) -> Self {
        Self {
            ciphertext: STANDARD.encode(ciphertext),
            encrypted_key: STANDARD.encode(wrapped_key),
            iv: STANDARD.encode(nonce),
        }
    }

    /// Base64 ciphertext with appended tag.
    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    /// Base64 wrapped content key.
    pub fn encrypted_key(&self) -> &str {
        &self.encrypted_key
    }

    /// Base64 nonce.
    pub fn iv(&self) -> &str {
        &self.iv
    }

    /// Canonical JSON form (field order `ciphertext`, `encryptedKey`, `iv`).
    ///
    /// # Panics
    ///
    /// Never in practice: a struct of three strings always serializes.
    #[allow(clippy::expect_used)]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("string fields always serialize")
    }

    /// Parse the JSON wire form.
    ///
    /// # Errors
    ///
    /// - `MalformedEnvelope`: not a JSON object with exactly the three fields
    pub fn from_json(text: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(text).map_err(|e| CryptoError::MalformedEnvelope {
            field: "envelope",
            reason: e.to_string(),
        })
    }

    pub(crate) fn decode(&self) -> Result<DecodedEnvelope, CryptoError> {
        let ciphertext = decode_field(FIELD_CIPHERTEXT, &self.ciphertext)?;
        let wrapped_key = decode_field(FIELD_ENCRYPTED_KEY, &self.encrypted_key)?;
        let nonce_bytes = decode_field(FIELD_IV, &self.iv)?;

        let nonce: [u8; NONCE_SIZE] =
            nonce_bytes.as_slice().try_into().map_err(|_| CryptoError::MalformedEnvelope {
                field: FIELD_IV,
                reason: format!("expected {NONCE_SIZE} bytes, got {}", nonce_bytes.len()),
            })?;

        Ok(DecodedEnvelope { ciphertext, wrapped_key, nonce })
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD.decode(value).map_err(|e| CryptoError::MalformedEnvelope {
        field,
        reason: format!("invalid base64: {e}"),
    })
}
