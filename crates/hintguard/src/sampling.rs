//! The process-wide random source behind sampled container checks.
//!
//! One `u32` is drawn per wrapper call and shared by every sampled container
//! in that call, so the source is touched once per call, not once per item.

use std::sync::{LazyLock, Mutex, PoisonError};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

static RNG: LazyLock<Mutex<ChaCha8Rng>> = LazyLock::new(|| Mutex::new(ChaCha8Rng::from_entropy()));

/// Draws the random integer for one call.
#[must_use]
pub fn next_random() -> u32 {
    RNG.lock().unwrap_or_else(PoisonError::into_inner).next_u32()
}

/// Reseeds the shared source, making subsequent draws reproducible.
pub fn reseed(seed: u64) {
    *RNG.lock().unwrap_or_else(PoisonError::into_inner) = ChaCha8Rng::seed_from_u64(seed);
}
