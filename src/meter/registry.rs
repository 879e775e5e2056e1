use super::{Cumulative, DerivedCumulative, DerivedGauge, Gauge, Meter, MetricOptions};
use crate::{
    clock::Clock,
    data::Metric,
    error::{MetricsError, Result},
    hashing::HashStrategy,
    measure::MeasureType,
    producer::MetricProducer,
};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

struct RegistryInner {
    metrics: RwLock<HashMap<String, Arc<dyn Meter>, FnvBuildHasher>>,
    clock: Clock,
    hash_strategy: HashStrategy,
}

impl RegistryInner {
    fn get_metrics(&self) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self.metrics.read().values().filter_map(|m| m.get_metric()).collect();
        metrics.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));
        metrics
    }
}

struct RegistryProducer {
    inner: Arc<RegistryInner>,
}

impl MetricProducer for RegistryProducer {
    fn get_metrics(&self) -> Vec<Metric> {
        self.inner.get_metrics()
    }
}

/// A named collection of gauges and cumulatives.
///
/// Metric names are unique within a registry.  Cloning the registry is cheap and clones share the
/// same metrics.
#[derive(Clone)]
pub struct MetricRegistry {
    inner: Arc<RegistryInner>,
    producer: Arc<RegistryProducer>,
}

impl MetricRegistry {
    pub fn new(clock: Clock, hash_strategy: HashStrategy) -> MetricRegistry {
        let inner = Arc::new(RegistryInner {
            metrics: RwLock::new(HashMap::default()),
            clock,
            hash_strategy,
        });
        let producer = Arc::new(RegistryProducer { inner: Arc::clone(&inner) });

        MetricRegistry { inner, producer }
    }

    pub fn add_int64_gauge(&self, name: &str, options: MetricOptions) -> Result<Arc<Gauge>> {
        self.register(name, |clock, hs| Gauge::new(name, options, MeasureType::Int64, clock, hs))
    }

    pub fn add_double_gauge(&self, name: &str, options: MetricOptions) -> Result<Arc<Gauge>> {
        self.register(name, |clock, hs| Gauge::new(name, options, MeasureType::Double, clock, hs))
    }

    pub fn add_derived_int64_gauge(&self, name: &str, options: MetricOptions) -> Result<Arc<DerivedGauge>> {
        self.register(name, |clock, hs| DerivedGauge::new(name, options, MeasureType::Int64, clock, hs))
    }

    pub fn add_derived_double_gauge(&self, name: &str, options: MetricOptions) -> Result<Arc<DerivedGauge>> {
        self.register(name, |clock, hs| DerivedGauge::new(name, options, MeasureType::Double, clock, hs))
    }

    pub fn add_int64_cumulative(&self, name: &str, options: MetricOptions) -> Result<Arc<Cumulative>> {
        self.register(name, |clock, hs| Cumulative::new(name, options, MeasureType::Int64, clock, hs))
    }

    pub fn add_double_cumulative(&self, name: &str, options: MetricOptions) -> Result<Arc<Cumulative>> {
        self.register(name, |clock, hs| Cumulative::new(name, options, MeasureType::Double, clock, hs))
    }

    pub fn add_derived_int64_cumulative(&self, name: &str, options: MetricOptions) -> Result<Arc<DerivedCumulative>> {
        self.register(name, |clock, hs| {
            DerivedCumulative::new(name, options, MeasureType::Int64, clock, hs)
        })
    }

    pub fn add_derived_double_cumulative(
        &self, name: &str, options: MetricOptions,
    ) -> Result<Arc<DerivedCumulative>> {
        self.register(name, |clock, hs| {
            DerivedCumulative::new(name, options, MeasureType::Double, clock, hs)
        })
    }

    /// Builds a meter and stores it under `name`, unless the name is already taken.
    fn register<T, F>(&self, name: &str, build: F) -> Result<Arc<T>>
    where
        T: Meter + 'static,
        F: FnOnce(Clock, HashStrategy) -> Result<T>,
    {
        let meter = Arc::new(build(self.inner.clock.clone(), self.inner.hash_strategy)?);

        let mut metrics = self.inner.metrics.write();
        if metrics.contains_key(name) {
            return Err(MetricsError::AlreadyRegistered(name.to_owned()));
        }
        let erased: Arc<dyn Meter> = meter.clone();
        metrics.insert(name.to_owned(), erased);
        debug!("registered metric {}", name);

        Ok(meter)
    }

    /// Removes the metric called `name`, returning whether it existed.
    ///
    /// Handles to the removed meter keep working but are no longer exported.
    pub fn remove_metric(&self, name: &str) -> bool {
        self.inner.metrics.write().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.inner.metrics.write().clear();
    }

    /// Exports every metric that has at least one series, ordered by name.
    pub fn get_metrics(&self) -> Vec<Metric> {
        self.inner.get_metrics()
    }

    /// The producer exporting this registry.  The same producer is returned on every call.
    pub fn metric_producer(&self) -> Arc<dyn MetricProducer> {
        self.producer.clone()
    }
}
