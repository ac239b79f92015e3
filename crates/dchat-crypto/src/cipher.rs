//! Hybrid encryption: AES-256-GCM content, RSA-OAEP wrapped key
//!
//! Every call to [`encrypt`] draws a fresh 32-byte content key and a fresh
//! 12-byte nonce from the caller's RNG, so a content key is never used twice.
//! Randomness is injected so tests can pin it; production callers pass the OS
//! generator.
//!
//! # Security
//!
//! - The recipient key is imported before any key material is drawn
//! - Content keys live in zeroizing buffers on both sides
//! - Decryption is all-or-nothing: a failed tag never yields bytes
//! - RSA-OAEP unwrapping is variable time (RUSTSEC-2023-0071); see the crate
//!   docs

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand_core::CryptoRngCore;
use rsa::Oaep;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    envelope::{CONTENT_KEY_SIZE, EncryptedEnvelope, NONCE_SIZE},
    error::CryptoError,
    keys::{KeyPair, PublicKey, import_public_key},
};

/// Encrypt `plaintext` for the holder of the PEM public key.
///
/// # Errors
///
/// - `MalformedKey`: `recipient_public_key` does not import
/// - `CryptoUnavailable`: the RNG failed
/// - `EncryptionFailed`: AES-GCM or RSA-OAEP failed
pub fn encrypt<R: CryptoRngCore>(
    plaintext: impl AsRef<[u8]>,
    recipient_public_key: &str,
    rng: &mut R,
) -> Result<EncryptedEnvelope, CryptoError> {
    let recipient = import_public_key(recipient_public_key)?;
    encrypt_for_key(plaintext, &recipient, rng)
}

/// Encrypt `plaintext` for an already imported public key.
pub fn encrypt_for_key<R: CryptoRngCore>(
    plaintext: impl AsRef<[u8]>,
    recipient: &PublicKey,
    rng: &mut R,
) -> Result<EncryptedEnvelope, CryptoError> {
    let mut content_key = Zeroizing::new([0u8; CONTENT_KEY_SIZE]);
    rng.try_fill_bytes(content_key.as_mut_slice()).map_err(CryptoError::unavailable)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rng.try_fill_bytes(&mut nonce).map_err(CryptoError::unavailable)?;

    let cipher = Aes256Gcm::new_from_slice(content_key.as_slice())
        .map_err(CryptoError::encryption_failed)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
        .map_err(CryptoError::encryption_failed)?;

    let wrapped_key = recipient
        .as_rsa()
        .encrypt(rng, Oaep::new::<Sha256>(), content_key.as_slice())
        .map_err(CryptoError::encryption_failed)?;

    debug_assert_eq!(wrapped_key.len(), recipient.size());

    Ok(EncryptedEnvelope::encode(&ciphertext, &wrapped_key, &nonce))
}

/// Decrypt an envelope addressed to `key_pair` and return the text.
///
/// # Errors
///
/// - `MalformedEnvelope`: a field is not base64 or the nonce has the wrong size
/// - `KeyMismatch`: the content key was not wrapped for this key pair
/// - `IntegrityCheckFailed`: the authentication tag does not verify
/// - `InvalidText`: the authenticated plaintext is not UTF-8
pub fn decrypt(envelope: &EncryptedEnvelope, key_pair: &KeyPair) -> Result<String, CryptoError> {
    let bytes = decrypt_bytes(envelope, key_pair)?;
    String::from_utf8(bytes).map_err(|_| CryptoError::InvalidText)
}

/// Decrypt an envelope to raw bytes.
pub fn decrypt_bytes(
    envelope: &EncryptedEnvelope,
    key_pair: &KeyPair,
) -> Result<Vec<u8>, CryptoError> {
    let decoded = envelope.decode()?;

    // Different modulus means a different key; OAEP would reject it anyway
    if decoded.wrapped_key.len() != key_pair.public_key().size() {
        return Err(CryptoError::KeyMismatch);
    }

    let content_key = Zeroizing::new(
        key_pair
            .as_rsa()
            .decrypt(Oaep::new::<Sha256>(), &decoded.wrapped_key)
            .map_err(|_| CryptoError::KeyMismatch)?,
    );
    if content_key.len() != CONTENT_KEY_SIZE {
        return Err(CryptoError::KeyMismatch);
    }

    let cipher =
        Aes256Gcm::new_from_slice(content_key.as_slice()).map_err(|_| CryptoError::KeyMismatch)?;

    cipher
        .decrypt(Nonce::from_slice(&decoded.nonce), decoded.ciphertext.as_slice())
        .map_err(|_| CryptoError::IntegrityCheckFailed)
}
