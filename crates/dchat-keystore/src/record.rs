//! On-disk record for one identity's key pair
//!
//! CBOR map with a format version, the public key PEM and the PKCS#8 private
//! key. The public half is stored alongside so a reader can publish it without
//! touching private material, and so a damaged private half is detected on
//! load instead of silently producing a different identity.

use dchat_crypto::{KeyPair, export_public_key};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{RecordError, StorageError};

/// Current record format.
pub const RECORD_VERSION: u8 = 1;

/// Serialized form of a persisted key pair.
///
/// The private key bytes are wiped when the record is dropped.
#[derive(Serialize, Deserialize)]
pub struct StoredKeyPair {
    /// Record format version
    pub version: u8,
    /// SPKI PEM of the public key
    pub public_key_pem: String,
    /// PKCS#8 DER of the private key
    pub private_key_pkcs8: Vec<u8>,
}

impl StoredKeyPair {
    /// Capture a key pair for persistence.
    pub fn from_key_pair(key_pair: &KeyPair) -> Result<Self, dchat_crypto::CryptoError> {
        let private = key_pair.to_pkcs8_der()?;
        Ok(Self {
            version: RECORD_VERSION,
            public_key_pem: export_public_key(key_pair)?,
            private_key_pkcs8: private.to_vec(),
        })
    }

    /// Rebuild the key pair, checking both halves agree.
    ///
    /// # Errors
    ///
    /// - `RecordError::UnsupportedVersion` for a record format this build does not read
    /// - `RecordError::InvalidKey` if the private key does not parse
    /// - `RecordError::PublicKeyMismatch` if the halves belong to different keys
    pub fn to_key_pair(&self) -> Result<KeyPair, RecordError> {
        if self.version != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion(self.version));
        }

        let key_pair = KeyPair::from_pkcs8_der(&self.private_key_pkcs8)?;
        if export_public_key(&key_pair)? != self.public_key_pem {
            return Err(RecordError::PublicKeyMismatch);
        }

        Ok(key_pair)
    }

    /// Encode as CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

impl Drop for StoredKeyPair {
    fn drop(&mut self) {
        self.private_key_pkcs8.zeroize();
    }
}
