//! Fault-injecting key store wrapper
//!
//! Wraps another store and randomly fails operations with `StorageError::Io`.
//! Used to check that the key manager surfaces store failures instead of
//! regenerating keys or reporting success.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use super::{KeyStore, StorageError};

/// Key store wrapper that randomly injects I/O failures
///
/// Failures happen before delegation, so a failed call never reaches the inner
/// store. Deterministic for a given seed.
#[derive(Clone)]
pub struct ChaoticKeyStore<S: KeyStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<Lcg>>,
    injected: Arc<Mutex<usize>>,
}

/// Linear congruential generator, Numerical Recipes constants.
struct Lcg {
    state: u64,
}

impl Lcg {
    /// Next value in [0.0, 1.0)
    #[allow(clippy::cast_precision_loss)]
    fn next_unit(&mut self) -> f64 {
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: KeyStore> ChaoticKeyStore<S> {
    /// Wrap `inner` with the default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed for reproducible failures.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(Lcg { state: seed })),
            injected: Arc::new(Mutex::new(0)),
        }
    }

    /// Underlying store, for checking state after chaos.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        #[allow(clippy::expect_used)]
        *self.injected.lock().expect("injected mutex poisoned")
    }

    fn inject(&self) -> Result<(), StorageError> {
        #[allow(clippy::expect_used)]
        let fail = self.rng.lock().expect("Lcg mutex poisoned").next_unit() < self.failure_rate;
        if !fail {
            return Ok(());
        }

        #[allow(clippy::expect_used)]
        let mut injected = self.injected.lock().expect("injected mutex poisoned");
        *injected += 1;
        Err(StorageError::Io("injected key store failure".to_string()))
    }
}

impl<S: KeyStore> KeyStore for ChaoticKeyStore<S> {
    fn load(&self, identity: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inject()?;
        self.inner.load(identity)
    }

    fn save(&self, identity: &str, record: &[u8]) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.save(identity, record)
    }

    fn save_if_absent(&self, identity: &str, record: &[u8]) -> Result<bool, StorageError> {
        self.inject()?;
        self.inner.save_if_absent(identity, record)
    }

    fn delete(&self, identity: &str) -> Result<bool, StorageError> {
        self.inject()?;
        self.inner.delete(identity)
    }
}
