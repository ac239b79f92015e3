//! Error types for key persistence

use dchat_crypto::CryptoError;
use thiserror::Error;

/// Errors from a [`crate::KeyStore`] back-end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Underlying I/O or database failure
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored bytes could not be encoded or decoded
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

/// Reasons a decoded [`crate::StoredKeyPair`] cannot become a key pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Written by a different record format
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),

    /// Private key bytes do not parse or are unacceptable
    #[error("stored private key is unusable: {0}")]
    InvalidKey(#[from] CryptoError),

    /// Stored public key is not the public half of the stored private key
    #[error("stored public key does not match private key")]
    PublicKeyMismatch,
}

/// Errors from [`crate::KeyManager`] operations.
#[derive(Debug, Error)]
pub enum KeyManagerError {
    /// The store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Key generation or encoding failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A stored record exists but cannot be turned back into a key pair
    ///
    /// Regenerating loses the ability to read history encrypted to the old
    /// key, so the manager never does it on its own.
    #[error("corrupt key record for identity `{identity}`: {reason}")]
    CorruptRecord {
        /// Identity whose record is corrupt
        identity: String,
        /// What failed while decoding it
        reason: String,
    },
}

impl KeyManagerError {
    /// Returns true if the operation may succeed on retry.
    ///
    /// Store I/O can be transient. Corrupt records and crypto failures are
    /// not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Io(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_is_transient() {
        assert!(KeyManagerError::from(StorageError::Io("disk busy".into())).is_transient());
    }

    #[test]
    fn corruption_is_not_transient() {
        let err =
            KeyManagerError::CorruptRecord { identity: "0xabc".into(), reason: "bad cbor".into() };
        assert!(!err.is_transient());
        assert!(!KeyManagerError::from(StorageError::Serialization("x".into())).is_transient());
        assert!(!KeyManagerError::from(CryptoError::KeyMismatch).is_transient());
    }

    #[test]
    fn record_error_display() {
        assert_eq!(RecordError::UnsupportedVersion(3).to_string(), "unsupported record version 3");
        assert_eq!(
            RecordError::PublicKeyMismatch.to_string(),
            "stored public key does not match private key"
        );
    }

    #[test]
    fn error_display() {
        let err =
            KeyManagerError::CorruptRecord { identity: "0xabc".into(), reason: "bad cbor".into() };
        assert_eq!(err.to_string(), "corrupt key record for identity `0xabc`: bad cbor");
        assert_eq!(StorageError::Io("gone".into()).to_string(), "storage I/O error: gone");
    }
}
