use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as raw bits so it can be updated without a lock.
#[derive(Debug, Default)]
pub(crate) struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub(crate) fn new(value: f64) -> AtomicF64 {
        AtomicF64 {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Applies `f` atomically, returning the new value.
    pub(crate) fn update<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = f(f64::from_bits(current)).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return f64::from_bits(next),
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn add(&self, amount: f64) -> f64 {
        self.update(|v| v + amount)
    }
}
