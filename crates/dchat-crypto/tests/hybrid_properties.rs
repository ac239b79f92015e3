//! Property-based tests for the hybrid cipher
//!
//! These tests verify the fundamental invariants of message encryption:
//!
//! 1. **Round-trip**: decrypt(encrypt(m, pk(K)), K) == m for all messages
//! 2. **Key isolation**: decrypting with another key pair is `KeyMismatch`
//! 3. **Tamper detection**: any flipped ciphertext byte is `IntegrityCheckFailed`
//! 4. **Freshness**: repeated encryptions share no field
//! 5. **Digest avalanche**: one changed byte changes the digest

use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD};
use dchat_crypto::{
    CryptoError, EncryptedEnvelope, KeyConfig, KeyPair, decrypt, digest, encrypt,
    export_public_key, generate_key_pair, import_public_key,
};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::OsRng};
use rand_chacha::ChaCha20Rng;

// RSA generation dominates runtime, so every property shares two pairs
static RECIPIENT: LazyLock<KeyPair> = LazyLock::new(|| {
    generate_key_pair(&mut ChaCha20Rng::seed_from_u64(0xD1), &KeyConfig::default()).unwrap()
});

static OUTSIDER: LazyLock<KeyPair> = LazyLock::new(|| {
    generate_key_pair(&mut ChaCha20Rng::seed_from_u64(0xD2), &KeyConfig::default()).unwrap()
});

static RECIPIENT_PEM: LazyLock<String> =
    LazyLock::new(|| export_public_key(&RECIPIENT).unwrap());

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        plaintext in any::<String>(),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let envelope = encrypt(&plaintext, &RECIPIENT_PEM, &mut rng).unwrap();

        prop_assert_eq!(decrypt(&envelope, &RECIPIENT).unwrap(), plaintext);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_other_key_pair_is_key_mismatch(
        plaintext in ".{0,200}",
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let envelope = encrypt(&plaintext, &RECIPIENT_PEM, &mut rng).unwrap();

        prop_assert_eq!(decrypt(&envelope, &OUTSIDER), Err(CryptoError::KeyMismatch));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_any_flipped_ciphertext_byte_is_detected(
        plaintext in ".{1,200}",
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let envelope = encrypt(&plaintext, &RECIPIENT_PEM, &mut rng).unwrap();

        let mut ciphertext = STANDARD.decode(envelope.ciphertext()).unwrap();
        let index = position.index(ciphertext.len());
        ciphertext[index] ^= mask;

        let tampered = EncryptedEnvelope::from_parts(
            STANDARD.encode(&ciphertext),
            envelope.encrypted_key(),
            envelope.iv(),
        );

        prop_assert_eq!(decrypt(&tampered, &RECIPIENT), Err(CryptoError::IntegrityCheckFailed));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_repeated_encryption_is_fresh(plaintext in ".{0,64}") {
        let first = encrypt(&plaintext, &RECIPIENT_PEM, &mut OsRng).unwrap();
        let second = encrypt(&plaintext, &RECIPIENT_PEM, &mut OsRng).unwrap();

        prop_assert_ne!(first.ciphertext(), second.ciphertext());
        prop_assert_ne!(first.encrypted_key(), second.encrypted_key());
        prop_assert_ne!(first.iv(), second.iv());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_digest_is_deterministic(content in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(digest(&content), digest(&content));
    }

    #[test]
    fn prop_single_byte_change_changes_digest(
        content in prop::collection::vec(any::<u8>(), 1..512),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let mut changed = content.clone();
        let index = position.index(changed.len());
        changed[index] ^= mask;

        let original = digest(&content);
        let altered = digest(&changed);
        prop_assert_ne!(original, altered);

        // Avalanche: roughly half the bits differ, never just a handful
        let differing_bits: u32 = original
            .as_bytes()
            .iter()
            .zip(altered.as_bytes())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        prop_assert!(differing_bits > 64, "only {} bits changed", differing_bits);
    }
}

#[test]
fn imported_key_encrypts_like_original() {
    let imported = import_public_key(&RECIPIENT_PEM).unwrap();
    let reexported = imported.to_pem().unwrap();
    assert_eq!(reexported, *RECIPIENT_PEM);

    let envelope = encrypt("via imported handle", &reexported, &mut OsRng).unwrap();
    assert_eq!(decrypt(&envelope, &RECIPIENT).unwrap(), "via imported handle");
}
