use crate::{clock::Clock, context::MetricsContext, hashing::HashStrategy};
use std::time::Duration;

/// A configuration builder for `MetricsContext`.
#[derive(Clone, Debug)]
pub struct Configuration {
    pub(crate) recalibration_interval: Duration,
    pub(crate) hash_strategy: HashStrategy,
    pub(crate) clock: Option<Clock>,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            recalibration_interval: Duration::from_secs(60),
            hash_strategy: HashStrategy::default(),
            clock: None,
        }
    }
}

impl Configuration {
    /// Creates a new `Configuration` with default values.
    pub fn new() -> Configuration {
        Default::default()
    }

    /// Sets the clock recalibration interval.
    ///
    /// Defaults to `60s`.
    ///
    /// Timestamps are derived by adding monotonic elapsed time to a wall-clock sample.  This
    /// controls how old that sample may get before it is taken again.  Shorter intervals track
    /// wall-clock adjustments more closely at the cost of reading the wall clock more often.
    ///
    /// Ignored when an explicit clock is supplied with `clock`.
    pub fn recalibration_interval(mut self, interval: Duration) -> Self {
        self.recalibration_interval = interval;
        self
    }

    /// Sets how series keys are derived from label values.
    ///
    /// Defaults to `HashStrategy::SortedValues`.
    ///
    /// The default sorts values before joining them, which merges series whose values form the
    /// same multiset under different keys.  `HashStrategy::Positional` keeps such series apart
    /// but produces different keys, so it should be chosen before anything is recorded.
    pub fn hash_strategy(mut self, hash_strategy: HashStrategy) -> Self {
        self.hash_strategy = hash_strategy;
        self
    }

    /// Uses `clock` instead of a system clock.
    ///
    /// Mostly useful in tests, with a clock built from `Mock` sources.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Create a `MetricsContext` based on this configuration.
    pub fn build(self) -> MetricsContext {
        MetricsContext::from_config(self)
    }
}
