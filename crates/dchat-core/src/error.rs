//! Service error types.

use dchat_crypto::{ContentDigest, CryptoError};
use dchat_keystore::KeyManagerError;
use thiserror::Error;

use crate::content::PublishedMessage;

/// Errors returned by [`crate::E2eService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A cryptographic operation failed.
    ///
    /// See [`CryptoError::is_tampering`] to tell a wrong key or modified
    /// message apart from caller mistakes.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Loading, creating or persisting the identity key pair failed.
    #[error(transparent)]
    KeyManager(#[from] KeyManagerError),

    /// The content store rejected an upload or fetch.
    #[error("content store error: {0}")]
    ContentStore(String),

    /// The envelope was stored, but only in local fallback storage.
    ///
    /// The message is still readable by this device. Other parties may not be
    /// able to fetch it. Carries everything needed to retry or to proceed
    /// anyway; the caller decides.
    #[error("content stored without pinning: {}", .message.content_ref)]
    StorageDegraded {
        /// The message as published to the fallback store
        message: Box<PublishedMessage>,
    },

    /// No content exists under the given reference.
    #[error("no content stored under `{content_ref}`")]
    ContentNotFound {
        /// Reference that was looked up
        content_ref: String,
    },

    /// Fetched content does not match the anchored digest.
    ///
    /// The payload was replaced or corrupted between publication and fetch.
    /// It is never parsed or decrypted.
    #[error("content digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Digest anchored at publication
        expected: ContentDigest,
        /// Digest of the fetched bytes
        actual: ContentDigest,
    },

    /// Fetched content matched its digest but is not an envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl ServiceError {
    /// Returns true if the error indicates a modified message or a message
    /// meant for another key.
    pub fn is_tampering(&self) -> bool {
        match self {
            Self::Crypto(err) => err.is_tampering(),
            Self::DigestMismatch { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the same call may succeed when retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Crypto(err) => err.is_retryable(),
            Self::KeyManager(err) => err.is_transient(),
            Self::ContentStore(_) | Self::StorageDegraded { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use dchat_crypto::digest;

    use super::*;

    #[test]
    fn digest_mismatch_is_tampering() {
        let err = ServiceError::DigestMismatch { expected: digest("a"), actual: digest("b") };
        assert!(err.is_tampering());
        assert!(!err.is_transient());
    }

    #[test]
    fn crypto_classification_passes_through() {
        assert!(ServiceError::from(CryptoError::IntegrityCheckFailed).is_tampering());
        assert!(!ServiceError::from(CryptoError::InvalidText).is_tampering());
    }

    #[test]
    fn not_found_display() {
        let err = ServiceError::ContentNotFound { content_ref: "mem:abc".into() };
        assert_eq!(err.to_string(), "no content stored under `mem:abc`");
    }
}
