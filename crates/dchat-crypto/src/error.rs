//! Error types for key handling, the hybrid cipher and digests

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Platform randomness or a required primitive is not usable
    #[error("cryptographic primitives unavailable: {reason}")]
    CryptoUnavailable {
        /// Underlying failure
        reason: String,
    },

    /// Public or private key could not be parsed or is unacceptable
    #[error("malformed key: {reason}")]
    MalformedKey {
        /// What was wrong with the key
        reason: String,
    },

    /// A primitive failed while producing an envelope
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// Underlying failure
        reason: String,
    },

    /// The wrapped key was not encrypted for this key pair
    #[error("wrapped key cannot be recovered with this key pair")]
    KeyMismatch,

    /// Authentication tag did not verify
    #[error("integrity check failed: ciphertext was modified or corrupted")]
    IntegrityCheckFailed,

    /// An envelope field could not be decoded or has the wrong size
    #[error("malformed envelope field `{field}`: {reason}")]
    MalformedEnvelope {
        /// Wire name of the offending field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Authenticated plaintext is not valid UTF-8
    #[error("decrypted message is not valid UTF-8")]
    InvalidText,

    /// Digest input could not be serialized to bytes
    #[error("unsupported digest input: {reason}")]
    UnsupportedInput {
        /// Serializer failure
        reason: String,
    },

    /// Requested RSA modulus size is outside the accepted range
    #[error("unsupported key size: {bits} bits")]
    UnsupportedKeySize {
        /// Requested modulus size
        bits: usize,
    },
}

impl CryptoError {
    /// Returns true if retrying with fresh randomness may succeed.
    ///
    /// Only primitive failures during encryption qualify. Key and integrity
    /// failures are deterministic for a given envelope and never improve on
    /// retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EncryptionFailed { .. })
    }

    /// Returns true if the envelope was addressed elsewhere or altered.
    ///
    /// The UI shows these distinctly from transient failures.
    pub fn is_tampering(&self) -> bool {
        matches!(self, Self::KeyMismatch | Self::IntegrityCheckFailed)
    }

    pub(crate) fn malformed_key(reason: impl Into<String>) -> Self {
        Self::MalformedKey { reason: reason.into() }
    }

    pub(crate) fn unavailable(reason: impl ToString) -> Self {
        Self::CryptoUnavailable { reason: reason.to_string() }
    }

    pub(crate) fn encryption_failed(reason: impl ToString) -> Self {
        Self::EncryptionFailed { reason: reason.to_string() }
    }
}
