//! Test-only generators.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::num::NonZeroU32;

use rand_core::{CryptoRng, RngCore};

/// Generator whose source is gone, like the OS RNG when getrandom fails.
///
/// Fallible draws report an error. Infallible draws panic, as `OsRng` does.
pub(crate) struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        panic!("entropy source unavailable")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("entropy source unavailable")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("entropy source unavailable")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
        let code = NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
        Err(rand_core::Error::from(code))
    }
}

impl CryptoRng for FailingRng {}
