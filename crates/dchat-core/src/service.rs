//! End-to-end encryption facade.

use std::sync::Arc;

use dchat_crypto::{ContentDigest, EncryptedEnvelope, KeyConfig, KeyPair, decrypt, digest, encrypt};
use dchat_keystore::{KeyManager, KeyStore};
use rand::rngs::OsRng;
use tracing::{debug, warn};

use crate::{
    content::{ContentStore, Durability, PublishedMessage},
    error::ServiceError,
};

/// The operations the rest of the application uses for message encryption.
///
/// Holds only the injected key store and the key configuration. Key pairs are
/// passed explicitly to every decrypt; randomness comes from the OS per call.
pub struct E2eService<S: KeyStore> {
    keys: KeyManager<S>,
}

impl<S: KeyStore> E2eService<S> {
    /// Create a service over `store`.
    ///
    /// # Errors
    ///
    /// - `ServiceError::KeyManager` if `config` is not a supported key size
    pub fn new(store: S, config: KeyConfig) -> Result<Self, ServiceError> {
        Ok(Self { keys: KeyManager::new(store, config)? })
    }

    /// Key lifecycle manager backing this service.
    pub fn key_manager(&self) -> &KeyManager<S> {
        &self.keys
    }

    /// The identity's key pair, generated and persisted on first use.
    pub fn generate_or_load_key_pair(&self, identity: &str) -> Result<Arc<KeyPair>, ServiceError> {
        let key_pair = self.keys.generate_or_load(identity, &mut OsRng)?;
        Ok(Arc::new(key_pair))
    }

    /// Replace the identity's key pair with a fresh one.
    ///
    /// Messages already encrypted to the old public key become unreadable.
    pub fn rotate_key_pair(&self, identity: &str) -> Result<Arc<KeyPair>, ServiceError> {
        let key_pair = self.keys.rotate(identity, &mut OsRng)?;
        Ok(Arc::new(key_pair))
    }

    /// Delete the identity's key pair. Returns `true` if one existed.
    pub fn reset_identity(&self, identity: &str) -> Result<bool, ServiceError> {
        Ok(self.keys.reset(identity)?)
    }

    /// Public key as SPKI PEM, for publishing to other users.
    pub fn export_public_key(&self, key_pair: &KeyPair) -> Result<String, ServiceError> {
        Ok(dchat_crypto::export_public_key(key_pair)?)
    }

    /// Encrypt `plaintext` so only the holder of `recipient_public_key` can
    /// read it.
    pub fn encrypt_for_recipient(
        &self,
        plaintext: &str,
        recipient_public_key: &str,
    ) -> Result<EncryptedEnvelope, ServiceError> {
        let envelope = encrypt(plaintext, recipient_public_key, &mut OsRng)?;

        debug!(bytes = plaintext.len(), "encrypted message");
        Ok(envelope)
    }

    /// Decrypt an envelope addressed to `key_pair`.
    pub fn decrypt_envelope(
        &self,
        envelope: &EncryptedEnvelope,
        key_pair: &KeyPair,
    ) -> Result<String, ServiceError> {
        let plaintext = decrypt(envelope, key_pair)?;

        debug!(bytes = plaintext.len(), "decrypted message");
        Ok(plaintext)
    }

    /// Encrypt for a recipient and upload the envelope to `store`.
    ///
    /// The returned digest is what gets anchored next to the content
    /// reference.
    ///
    /// # Errors
    ///
    /// - `ServiceError::StorageDegraded` if the store only kept a local copy;
    ///   the error carries the published message
    /// - `ServiceError::ContentStore` if the upload failed
    /// - `ServiceError::Crypto` if encryption failed
    pub fn publish<C: ContentStore + ?Sized>(
        &self,
        plaintext: &str,
        recipient_public_key: &str,
        store: &C,
    ) -> Result<PublishedMessage, ServiceError> {
        let envelope = self.encrypt_for_recipient(plaintext, recipient_public_key)?;
        let payload = envelope.to_json();
        let digest = digest(&payload);

        let receipt =
            store.put(payload.as_bytes()).map_err(|e| ServiceError::ContentStore(e.to_string()))?;

        let message = PublishedMessage { envelope, digest, content_ref: receipt.content_ref };

        match receipt.durability {
            Durability::Pinned => {
                debug!(content_ref = %message.content_ref, %digest, "published envelope");
                Ok(message)
            },
            Durability::LocalFallback => {
                warn!(
                    content_ref = %message.content_ref,
                    "envelope kept in local fallback storage only"
                );
                Err(ServiceError::StorageDegraded { message: Box::new(message) })
            },
        }
    }

    /// Fetch an envelope from `store`, verify it against the anchored digest
    /// and decrypt it.
    ///
    /// # Errors
    ///
    /// - `ServiceError::ContentNotFound` if nothing is stored under `content_ref`
    /// - `ServiceError::DigestMismatch` if the fetched bytes are not what was anchored
    /// - `ServiceError::MalformedPayload` if the bytes are not an envelope
    /// - `ServiceError::Crypto` if decryption fails
    pub fn retrieve<C: ContentStore + ?Sized>(
        &self,
        content_ref: &str,
        expected_digest: &ContentDigest,
        store: &C,
        key_pair: &KeyPair,
    ) -> Result<String, ServiceError> {
        let payload = store
            .get(content_ref)
            .map_err(|e| ServiceError::ContentStore(e.to_string()))?
            .ok_or_else(|| ServiceError::ContentNotFound { content_ref: content_ref.to_owned() })?;

        let actual = digest(&payload);
        if actual != *expected_digest {
            warn!(
                content_ref,
                expected = %expected_digest,
                %actual,
                "fetched content does not match anchor"
            );
            return Err(ServiceError::DigestMismatch { expected: *expected_digest, actual });
        }

        let text = std::str::from_utf8(&payload)
            .map_err(|e| ServiceError::MalformedPayload(e.to_string()))?;
        let envelope = EncryptedEnvelope::from_json(text)
            .map_err(|e| ServiceError::MalformedPayload(e.to_string()))?;

        self.decrypt_envelope(&envelope, key_pair)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use dchat_crypto::digest_envelope;
    use dchat_keystore::MemoryKeyStore;

    use super::*;
    use crate::content::MemoryContentStore;

    struct Fixture {
        service: E2eService<MemoryKeyStore>,
        alice: Arc<KeyPair>,
        alice_pem: String,
    }

    static FIXTURE: LazyLock<Fixture> = LazyLock::new(|| {
        let service = E2eService::new(MemoryKeyStore::new(), KeyConfig::default()).unwrap();
        let alice = service.generate_or_load_key_pair("0xalice").unwrap();
        let alice_pem = service.export_public_key(&alice).unwrap();
        Fixture { service, alice, alice_pem }
    });

    #[test]
    fn key_pair_is_stable_per_identity() {
        let again = FIXTURE.service.generate_or_load_key_pair("0xalice").unwrap();
        assert_eq!(again.public_key(), FIXTURE.alice.public_key());
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let envelope = FIXTURE.service.encrypt_for_recipient("gm", &FIXTURE.alice_pem).unwrap();
        assert_eq!(FIXTURE.service.decrypt_envelope(&envelope, &FIXTURE.alice).unwrap(), "gm");
    }

    #[test]
    fn publish_then_retrieve() {
        let store = MemoryContentStore::new();
        let published = FIXTURE.service.publish("on chain", &FIXTURE.alice_pem, &store).unwrap();

        assert_eq!(published.digest, digest_envelope(&published.envelope));

        let text = FIXTURE
            .service
            .retrieve(&published.content_ref, &published.digest, &store, &FIXTURE.alice)
            .unwrap();
        assert_eq!(text, "on chain");
    }

    #[test]
    fn degraded_store_is_surfaced() {
        let store = MemoryContentStore::new();
        store.set_degraded(true);

        let err = FIXTURE.service.publish("fallback", &FIXTURE.alice_pem, &store).err().unwrap();
        let ServiceError::StorageDegraded { message } = err else {
            panic!("expected StorageDegraded, got {err:?}");
        };

        // Still readable locally
        let text = FIXTURE
            .service
            .retrieve(&message.content_ref, &message.digest, &store, &FIXTURE.alice)
            .unwrap();
        assert_eq!(text, "fallback");
    }

    #[test]
    fn swapped_content_is_rejected() {
        let store = MemoryContentStore::new();
        let published = FIXTURE.service.publish("original", &FIXTURE.alice_pem, &store).unwrap();
        let other = FIXTURE.service.encrypt_for_recipient("forged", &FIXTURE.alice_pem).unwrap();
        store.overwrite(&published.content_ref, other.to_json().into_bytes());

        let err = FIXTURE
            .service
            .retrieve(&published.content_ref, &published.digest, &store, &FIXTURE.alice)
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::DigestMismatch { .. }));
        assert!(err.is_tampering());
    }

    #[test]
    fn missing_content_is_not_found() {
        let err = FIXTURE
            .service
            .retrieve("mem:nothing", &digest(""), &MemoryContentStore::new(), &FIXTURE.alice)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ServiceError::ContentNotFound { ref content_ref } if content_ref == "mem:nothing"
        ));
    }

    #[test]
    fn non_envelope_payload_is_malformed() {
        let store = MemoryContentStore::new();
        let receipt = store.put(b"{\"hello\":1}").unwrap();

        let err = FIXTURE
            .service
            .retrieve(&receipt.content_ref, &digest(b"{\"hello\":1}"), &store, &FIXTURE.alice)
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::MalformedPayload(_)));
    }

    #[test]
    fn invalid_recipient_key_is_crypto_error() {
        let err = FIXTURE.service.encrypt_for_recipient("hi", "not a key").err().unwrap();
        assert!(matches!(
            err,
            ServiceError::Crypto(dchat_crypto::CryptoError::MalformedKey { .. })
        ));
    }
}
