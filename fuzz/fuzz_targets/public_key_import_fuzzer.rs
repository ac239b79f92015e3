//! Fuzz target for public key import and PEM framing
//!
//! # Strategy
//!
//! - Arbitrary text as a PEM public key
//! - Arbitrary DER wrapped in well-formed PEM framing
//! - Line ending and wrapping variations of a valid key
//!
//! # Invariants
//!
//! - NEVER panic on malformed keys
//! - Any accepted key re-exports to PEM that imports to the same key
//! - Accepted keys are never below the minimum modulus size
//! - Line ending and wrapping changes never change the imported key

#![no_main]

use std::sync::LazyLock;

use arbitrary::Arbitrary;
use dchat_crypto::{
    KeyConfig, MIN_MODULUS_BITS, PUBLIC_KEY_LABEL, export_public_key, generate_key_pair,
    import_public_key, pem,
};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

static VALID_PEM: LazyLock<String> = LazyLock::new(|| {
    let key_pair =
        generate_key_pair(&mut ChaCha20Rng::seed_from_u64(0xF023), &KeyConfig::default()).unwrap();
    export_public_key(&key_pair).unwrap()
});

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Text(String),
    Der(Vec<u8>),
    Reformatted { crlf: bool, width: u8, leading: u8, trailing: u8 },
}

fuzz_target!(|input: Input| {
    match input {
        Input::Text(text) => check(&text),
        Input::Der(der) => check(&pem::encode(PUBLIC_KEY_LABEL, &der)),
        Input::Reformatted { crlf, width, leading, trailing } => {
            let original = import_public_key(&VALID_PEM).unwrap();

            let lines: Vec<&str> = VALID_PEM.lines().collect();
            let body: String = lines[1..lines.len() - 1].concat();
            let width = (width as usize % 96) + 1;
            let newline = if crlf { "\r\n" } else { "\n" };

            let mut text = " ".repeat(leading as usize % 8);
            text.push_str(lines[0]);
            for chunk in body.as_bytes().chunks(width) {
                text.push_str(newline);
                text.push_str(std::str::from_utf8(chunk).unwrap());
            }
            text.push_str(newline);
            text.push_str(lines[lines.len() - 1]);
            text.push_str(&"\n".repeat(trailing as usize % 4));

            assert_eq!(import_public_key(&text).unwrap(), original);
        }
    }
});

fn check(text: &str) {
    let Ok(key) = import_public_key(text) else {
        return;
    };

    assert!(key.bits() >= MIN_MODULUS_BITS, "accepted undersized key");

    let exported = key.to_pem().unwrap();
    assert_eq!(import_public_key(&exported).unwrap(), key);
}
