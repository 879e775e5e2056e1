use crate::{
    clock::Clock, configuration::Configuration, meter::MetricRegistry, producer::MetricProducerManager, stats::Stats,
};
use log::debug;

/// The process-wide metrics state: one clock, one stats registrar, one metric registry, and the
/// producer manager exporters poll.
///
/// Build it once at startup and hand clones to whatever needs it; clones share all state.
#[derive(Clone)]
pub struct MetricsContext {
    clock: Clock,
    stats: Stats,
    registry: MetricRegistry,
    producers: MetricProducerManager,
}

impl MetricsContext {
    /// Creates a context with the default configuration.
    pub fn new() -> MetricsContext {
        Configuration::new().build()
    }

    pub(crate) fn from_config(config: Configuration) -> MetricsContext {
        let interval = config.recalibration_interval;
        let clock = config.clock.unwrap_or_else(|| Clock::with_interval(interval));
        let stats = Stats::new(clock.clone(), config.hash_strategy);
        let registry = MetricRegistry::new(clock.clone(), config.hash_strategy);

        let context = MetricsContext {
            clock,
            stats,
            registry,
            producers: MetricProducerManager::new(),
        };
        context.add_default_producers();
        context
    }

    fn add_default_producers(&self) {
        self.producers.add(self.stats.metric_producer());
        self.producers.add(self.registry.metric_producer());
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn producer_manager(&self) -> &MetricProducerManager {
        &self.producers
    }

    /// Drops every view, measure, listener, metric and extra producer, leaving the context as it
    /// was right after construction.
    pub fn reset(&self) {
        debug!("resetting metrics context");
        self.stats.clear();
        self.registry.clear();
        self.producers.remove_all();
        self.add_default_producers();
    }
}

impl Default for MetricsContext {
    fn default() -> MetricsContext {
        MetricsContext::new()
    }
}

#[cfg(test)]
mod tests {
    use super::MetricsContext;
    use crate::{
        clock::{Clock, Mock, Timestamp},
        configuration::Configuration,
        data::{AggregationType, Metric},
        meter::MetricOptions,
        producer::MetricProducer,
    };
    use std::{sync::Arc, time::Duration};

    struct Fixed;

    impl MetricProducer for Fixed {
        fn get_metrics(&self) -> Vec<Metric> {
            Vec::new()
        }
    }

    #[test]
    fn test_default_producers() {
        let context = MetricsContext::new();
        let producers = context.producer_manager().get_all_metric_producers();
        assert_eq!(producers.len(), 2);
        assert!(producers.iter().any(|p| Arc::ptr_eq(p, &context.stats().metric_producer())));
        assert!(producers.iter().any(|p| Arc::ptr_eq(p, &context.registry().metric_producer())));
    }

    #[test]
    fn test_configured_clock_is_shared() {
        let mono = Arc::new(Mock::new(0));
        let clock = Clock::from_parts(Mock::new(7 * 1_000_000_000), mono.clone(), Duration::from_secs(60));
        let context = Configuration::new().clock(clock).build();
        mono.increment(1_000_000_000);

        assert_eq!(context.clock().now(), Timestamp::new(8, 0));
        let m = context.stats().create_measure_double("m", "1", "").unwrap();
        let view = context
            .stats()
            .create_and_register_view("m_sum", &m, AggregationType::Sum, vec![], "", None)
            .unwrap();
        assert_eq!(view.start_time(), Timestamp::new(8, 0));
    }

    #[test]
    fn test_interval_only_configuration() {
        let context = Configuration::new()
            .recalibration_interval(Duration::from_secs(1))
            .build();
        assert!(context.clock().now().seconds > 0);
        assert_eq!(context.producer_manager().len(), 2);
    }

    #[test]
    fn test_reset() {
        let context = MetricsContext::new();
        context.producer_manager().add(Arc::new(Fixed));
        context
            .registry()
            .add_int64_gauge("g", MetricOptions::new())
            .unwrap()
            .get_default_time_series()
            .set(1.0);
        context.stats().create_measure_double("m", "1", "").unwrap();

        let clone = context.clone();
        clone.reset();

        assert_eq!(context.producer_manager().len(), 2);
        assert!(context.registry().get_metrics().is_empty());
        assert!(context.stats().registered_measures().is_empty());
        assert!(context.registry().add_int64_gauge("g", MetricOptions::new()).is_ok());
    }
}
