use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random choice backed by one generator seeded at startup.
pub(crate) struct ResponseSelector {
    rng: Mutex<StdRng>,
}

impl ResponseSelector {
    pub(crate) fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub(crate) fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// `None` only for an empty slice.
    pub(crate) fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let idx = rng.random_range(0..items.len());
        items.get(idx)
    }
}
