//! Fuzz target for envelope parsing and decryption
//!
//! # Strategy
//!
//! - Raw JSON: arbitrary text through `EncryptedEnvelope::from_json`
//! - Raw fields: arbitrary strings as the three base64 fields
//! - Mutation: a valid envelope with one field's decoded bytes flipped,
//!   truncated or extended
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - A mutated envelope never decrypts
//! - An unmutated envelope always decrypts to its plaintext

#![no_main]

use std::sync::LazyLock;

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::STANDARD};
use dchat_crypto::{
    EncryptedEnvelope, KeyConfig, KeyPair, decrypt_bytes, encrypt, export_public_key,
    generate_key_pair,
};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

static KEY_PAIR: LazyLock<KeyPair> = LazyLock::new(|| {
    generate_key_pair(&mut ChaCha20Rng::seed_from_u64(0xF022), &KeyConfig::default()).unwrap()
});

static PUBLIC_PEM: LazyLock<String> = LazyLock::new(|| export_public_key(&KEY_PAIR).unwrap());

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    RawJson(String),
    RawFields { ciphertext: String, encrypted_key: String, iv: String },
    Mutated { plaintext: Vec<u8>, seed: u64, field: Field, mutation: Mutation },
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Field {
    Ciphertext,
    EncryptedKey,
    Iv,
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    None,
    Flip { position: u16, mask: u8 },
    Truncate { len: u16 },
    Extend { bytes: Vec<u8> },
}

fuzz_target!(|input: Input| {
    match input {
        Input::RawJson(text) => {
            if let Ok(envelope) = EncryptedEnvelope::from_json(&text) {
                let _ = decrypt_bytes(&envelope, &KEY_PAIR);
            }
        }

        Input::RawFields { ciphertext, encrypted_key, iv } => {
            let envelope = EncryptedEnvelope::from_parts(ciphertext, encrypted_key, iv);
            let _ = decrypt_bytes(&envelope, &KEY_PAIR);
        }

        Input::Mutated { plaintext, seed, field, mutation } => {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let envelope = encrypt(&plaintext, &PUBLIC_PEM, &mut rng).unwrap();

            let mut parts = [
                STANDARD.decode(envelope.ciphertext()).unwrap(),
                STANDARD.decode(envelope.encrypted_key()).unwrap(),
                STANDARD.decode(envelope.iv()).unwrap(),
            ];
            let target = &mut parts[field as usize];
            let original = target.clone();

            match mutation {
                Mutation::None => {}
                Mutation::Flip { position, mask } => {
                    if !target.is_empty() {
                        let index = position as usize % target.len();
                        target[index] ^= mask;
                    }
                }
                Mutation::Truncate { len } => target.truncate(len as usize),
                Mutation::Extend { bytes } => target.extend_from_slice(&bytes),
            }
            let changed = *target != original;

            let mutated = EncryptedEnvelope::from_parts(
                STANDARD.encode(&parts[0]),
                STANDARD.encode(&parts[1]),
                STANDARD.encode(&parts[2]),
            );

            match decrypt_bytes(&mutated, &KEY_PAIR) {
                Ok(recovered) => {
                    assert!(!changed, "mutated envelope decrypted");
                    assert_eq!(recovered.as_slice(), plaintext.as_slice());
                }
                Err(err) => assert!(changed, "unmutated envelope failed: {err}"),
            }
        }
    }
});
