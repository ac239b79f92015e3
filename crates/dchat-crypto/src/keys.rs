//! RSA key pairs for wrapping one-time message keys
//!
//! # Security
//!
//! - Private keys are zeroized on drop (the RSA key type wipes its own limbs)
//! - The only private-key export is PKCS#8 for the persistence layer, returned
//!   in a zeroizing buffer
//! - Imported public keys below [`MIN_MODULUS_BITS`] are rejected

use std::fmt;

use rand_core::CryptoRngCore;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    traits::PublicKeyParts,
};
use zeroize::Zeroizing;

use crate::{error::CryptoError, pem};

/// Smallest accepted RSA modulus.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Largest modulus accepted for generation.
pub const MAX_MODULUS_BITS: usize = 4096;

/// PEM label of an exported public key.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Key generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConfig {
    /// RSA modulus size in bits
    pub modulus_bits: usize,
}

impl KeyConfig {
    /// Check the modulus size is within `MIN_MODULUS_BITS..=MAX_MODULUS_BITS`.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if (MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&self.modulus_bits) {
            Ok(())
        } else {
            Err(CryptoError::UnsupportedKeySize { bits: self.modulus_bits })
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self { modulus_bits: MIN_MODULUS_BITS }
    }
}

/// A recipient's public key, usable for wrapping only.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.size() * 8
    }

    /// Modulus size in bytes. Also the length of every wrapped key.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Serialize as a PEM-framed SubjectPublicKeyInfo.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let der = self
            .inner
            .to_public_key_der()
            .map_err(|e| CryptoError::malformed_key(format!("cannot encode public key: {e}")))?;
        Ok(pem::encode(PUBLIC_KEY_LABEL, der.as_bytes()))
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey").field("bits", &self.bits()).finish()
    }
}

/// An identity's long-lived key pair.
///
/// Immutable once created; rotation means generating a new pair. Not `Clone`:
/// share it behind an `Arc` so there is exactly one copy of the private key.
pub struct KeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl KeyPair {
    fn from_private(private: RsaPrivateKey) -> Self {
        let public = PublicKey { inner: private.to_public_key() };
        Self { private, public }
    }

    /// The shareable half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Export the private key as PKCS#8 DER for persistence.
    ///
    /// The returned buffer is wiped when dropped.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let document = self
            .private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::malformed_key(format!("cannot encode private key: {e}")))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// Rebuild a key pair from PKCS#8 DER produced by [`Self::to_pkcs8_der`].
    ///
    /// # Errors
    ///
    /// - `MalformedKey`: not PKCS#8, not RSA, inconsistent key material, or a
    ///   modulus below [`MIN_MODULUS_BITS`]
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::malformed_key(format!("invalid private key: {e}")))?;
        private
            .validate()
            .map_err(|e| CryptoError::malformed_key(format!("inconsistent private key: {e}")))?;

        let pair = Self::from_private(private);
        ensure_min_size(&pair.public)?;
        Ok(pair)
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// Generate a fresh key pair.
///
/// Randomness comes from `rng`; production callers pass the OS generator.
///
/// # Errors
///
/// - `UnsupportedKeySize`: `config` is outside the accepted range
/// - `CryptoUnavailable`: the RNG or prime generation failed
pub fn generate_key_pair<R: CryptoRngCore>(
    rng: &mut R,
    config: &KeyConfig,
) -> Result<KeyPair, CryptoError> {
    config.validate()?;

    // Prime generation draws through infallible `fill_bytes`, which panics on
    // a dead OS RNG. Check the generator fallibly first.
    let mut check = Zeroizing::new([0u8; 32]);
    rng.try_fill_bytes(check.as_mut_slice()).map_err(CryptoError::unavailable)?;

    let private = RsaPrivateKey::new(rng, config.modulus_bits).map_err(CryptoError::unavailable)?;
    Ok(KeyPair::from_private(private))
}

/// Export a key pair's public half as PEM text.
pub fn export_public_key(key_pair: &KeyPair) -> Result<String, CryptoError> {
    key_pair.public_key().to_pem()
}

/// Parse a PEM public key exported by [`export_public_key`] (or any
/// SubjectPublicKeyInfo RSA key of at least 2048 bits).
///
/// # Errors
///
/// - `MalformedKey`: bad framing, bad base64, not an RSA SPKI, or too small
pub fn import_public_key(text: &str) -> Result<PublicKey, CryptoError> {
    let der = pem::decode(PUBLIC_KEY_LABEL, text)?;
    let inner = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CryptoError::malformed_key(format!("invalid public key: {e}")))?;

    let public = PublicKey { inner };
    ensure_min_size(&public)?;
    Ok(public)
}

fn ensure_min_size(public: &PublicKey) -> Result<(), CryptoError> {
    if public.bits() < MIN_MODULUS_BITS {
        return Err(CryptoError::malformed_key(format!(
            "{}-bit modulus is below the {MIN_MODULUS_BITS}-bit minimum",
            public.bits()
        )));
    }
    Ok(())
}
