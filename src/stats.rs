use crate::{
    clock::Clock,
    data::{AggregationType, Metric},
    error::Result,
    hashing::HashStrategy,
    listener::StatsEventListener,
    measure::{Measure, MeasureType, Measurement},
    producer::MetricProducer,
    tags::{Attachments, TagKey, TagMap},
    view::View,
};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use log::{debug, warn};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Default)]
struct Registered {
    by_name: HashMap<String, Arc<View>, FnvBuildHasher>,
    by_measure: HashMap<String, Vec<Arc<View>>, FnvBuildHasher>,
}

struct StatsInner {
    views: RwLock<Registered>,
    measures: RwLock<HashMap<String, Measure, FnvBuildHasher>>,
    listeners: RwLock<Vec<Arc<dyn StatsEventListener>>>,
    clock: Clock,
    hash_strategy: HashStrategy,
}

impl StatsInner {
    fn registered_views(&self) -> Vec<Arc<View>> {
        let mut views: Vec<Arc<View>> = self.views.read().by_name.values().cloned().collect();
        views.sort_by(|a, b| a.name().cmp(b.name()));
        views
    }
}

struct StatsProducer {
    inner: Arc<StatsInner>,
}

impl MetricProducer for StatsProducer {
    fn get_metrics(&self) -> Vec<Metric> {
        self.inner
            .registered_views()
            .iter()
            .filter_map(|view| view.get_metric(view.start_time()))
            .collect()
    }
}

fn same_listener(a: &Arc<dyn StatsEventListener>, b: &Arc<dyn StatsEventListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// The stats registrar.
///
/// Owns the registered measures and views, fans recorded measurements out to every view of the
/// measurement's measure, and notifies listeners.  Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct Stats {
    inner: Arc<StatsInner>,
    producer: Arc<StatsProducer>,
}

impl Stats {
    pub fn new(clock: Clock, hash_strategy: HashStrategy) -> Stats {
        let inner = Arc::new(StatsInner {
            views: RwLock::new(Registered::default()),
            measures: RwLock::new(HashMap::default()),
            listeners: RwLock::new(Vec::new()),
            clock,
            hash_strategy,
        });
        let producer = Arc::new(StatsProducer { inner: Arc::clone(&inner) });

        Stats { inner, producer }
    }

    pub fn create_measure_int64(&self, name: &str, unit: &str, description: &str) -> Result<Measure> {
        self.create_measure(name, unit, description, MeasureType::Int64)
    }

    pub fn create_measure_double(&self, name: &str, unit: &str, description: &str) -> Result<Measure> {
        self.create_measure(name, unit, description, MeasureType::Double)
    }

    /// Measure names are unique: asking for a name that exists returns the existing measure.
    fn create_measure(&self, name: &str, unit: &str, description: &str, measure_type: MeasureType) -> Result<Measure> {
        let measure = Measure::new(name, unit, description, measure_type)?;

        let mut measures = self.inner.measures.write();
        let entry = measures.entry(name.to_owned()).or_insert(measure);
        Ok(entry.clone())
    }

    /// Creates an unregistered view.
    ///
    /// `bucket_boundaries` are required for `AggregationType::Distribution` and ignored otherwise.
    pub fn create_view(
        &self, name: &str, measure: &Measure, aggregation: AggregationType, tag_keys: Vec<TagKey>, description: &str,
        bucket_boundaries: Option<Vec<f64>>,
    ) -> Result<View> {
        View::new(
            name,
            measure.clone(),
            aggregation,
            tag_keys,
            description,
            bucket_boundaries,
            self.inner.clock.clone(),
            self.inner.hash_strategy,
        )
    }

    /// Registers a view so recordings of its measure reach it.
    ///
    /// If a view with the same name is already registered, that view is returned and `view` is
    /// discarded.  Listeners hear about a view only the first time it is registered.
    pub fn register_view(&self, view: View) -> Arc<View> {
        let view = {
            let mut views = self.inner.views.write();
            if let Some(existing) = views.by_name.get(view.name()) {
                return Arc::clone(existing);
            }

            let view = Arc::new(view);
            views.by_name.insert(view.name().to_owned(), Arc::clone(&view));
            views
                .by_measure
                .entry(view.measure().name().to_owned())
                .or_insert_with(Vec::new)
                .push(Arc::clone(&view));
            view
        };

        self.inner
            .measures
            .write()
            .entry(view.measure().name().to_owned())
            .or_insert_with(|| view.measure().clone());

        if view.mark_registered() {
            debug!("registered view {}", view.name());
            let listeners = self.inner.listeners.read().clone();
            for listener in &listeners {
                listener.on_register_view(&view);
            }
        }

        view
    }

    pub fn create_and_register_view(
        &self, name: &str, measure: &Measure, aggregation: AggregationType, tag_keys: Vec<TagKey>, description: &str,
        bucket_boundaries: Option<Vec<f64>>,
    ) -> Result<Arc<View>> {
        let view = self.create_view(name, measure, aggregation, tag_keys, description, bucket_boundaries)?;
        Ok(self.register_view(view))
    }

    /// Records a batch of measurements under `tags`.
    ///
    /// Returns `false`, recording nothing, if any measurement in the batch is negative or
    /// non-finite.
    pub fn record(&self, measurements: &[Measurement], tags: Option<&TagMap>) -> bool {
        self.record_with_attachments(measurements, tags, None)
    }

    /// Like `record`, additionally attaching `attachments` to any exemplars the batch produces.
    pub fn record_with_attachments(
        &self, measurements: &[Measurement], tags: Option<&TagMap>, attachments: Option<&Attachments>,
    ) -> bool {
        if let Some(err) = measurements.iter().find_map(|m| m.validate().err()) {
            warn!("rejecting batch of {} measurements: {}", measurements.len(), err);
            return false;
        }

        let empty = TagMap::new();
        let tags = tags.unwrap_or(&empty);
        let listeners = self.inner.listeners.read().clone();

        for measurement in measurements {
            let mut views = self.views_for_measure(measurement.measure.name());
            views.retain(|view| *view.measure() == measurement.measure);
            if views.is_empty() {
                continue;
            }

            for view in &views {
                if let Err(e) = view.record_measurement(measurement, tags, attachments) {
                    debug!("view {} rejected measurement: {}", view.name(), e);
                }
            }
            for listener in &listeners {
                listener.on_record(&views, measurement, tags);
            }
        }

        true
    }

    /// Adds a listener.  Adding the same listener twice is a no-op.
    pub fn register_exporter(&self, listener: Arc<dyn StatsEventListener>) {
        let mut listeners = self.inner.listeners.write();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Removes a listener, returning whether it was registered.
    pub fn unregister_exporter(&self, listener: &Arc<dyn StatsEventListener>) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn views_for_measure(&self, measure_name: &str) -> Vec<Arc<View>> {
        self.inner
            .views
            .read()
            .by_measure
            .get(measure_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Every registered view, ordered by name.
    pub fn registered_views(&self) -> Vec<Arc<View>> {
        self.inner.registered_views()
    }

    /// Every known measure, ordered by name.
    pub fn registered_measures(&self) -> Vec<Measure> {
        let mut measures: Vec<Measure> = self.inner.measures.read().values().cloned().collect();
        measures.sort_by(|a, b| a.name().cmp(b.name()));
        measures
    }

    /// The producer exporting every registered view.  The same producer is returned on every call.
    pub fn metric_producer(&self) -> Arc<dyn MetricProducer> {
        self.producer.clone()
    }

    /// Forgets every view, measure and listener.
    pub fn clear(&self) {
        {
            let mut views = self.inner.views.write();
            views.by_name.clear();
            views.by_measure.clear();
        }
        self.inner.measures.write().clear();
        self.inner.listeners.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Stats;
    use crate::{
        clock::{Clock, Mock},
        data::{AggregationData, AggregationType, PointValue},
        hashing::HashStrategy,
        listener::StatsEventListener,
        measure::{Measure, MeasureType, Measurement},
        tags::{Attachments, TagKey, TagMap, TagValue},
        view::View,
    };
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    #[derive(Default)]
    struct Counting {
        registered: AtomicUsize,
        recorded: AtomicUsize,
    }

    impl StatsEventListener for Counting {
        fn on_register_view(&self, _view: &Arc<View>) {
            self.registered.fetch_add(1, Ordering::SeqCst);
        }

        fn on_record(&self, views: &[Arc<View>], _measurement: &Measurement, _tags: &TagMap) {
            assert!(!views.is_empty());
            self.recorded.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stats() -> Stats {
        let clock = Clock::from_parts(Mock::new(10 * 1_000_000_000), Mock::new(0), Duration::from_secs(60));
        Stats::new(clock, HashStrategy::default())
    }

    fn key(s: &str) -> TagKey {
        TagKey::new(s).unwrap()
    }

    #[test]
    fn test_measures_are_unique_by_name() {
        let stats = stats();
        let a = stats.create_measure_double("latency", "ms", "first").unwrap();
        let b = stats.create_measure_double("latency", "s", "second").unwrap();
        assert_eq!(a, b);
        assert_eq!(b.unit(), "ms");
        assert!(stats.create_measure_int64("", "1", "").is_err());
        assert_eq!(stats.registered_measures().len(), 1);
    }

    #[test]
    fn test_register_view_once() {
        let stats = stats();
        let listener = Arc::new(Counting::default());
        stats.register_exporter(listener.clone());

        let m = stats.create_measure_double("latency", "ms", "").unwrap();
        let first = stats
            .create_and_register_view("latency_sum", &m, AggregationType::Sum, vec![], "", None)
            .unwrap();
        assert!(first.is_registered());

        let unregistered = stats
            .create_view("latency_sum", &m, AggregationType::Count, vec![], "", None)
            .unwrap();
        assert!(!unregistered.is_registered());
        let second = stats.register_view(unregistered);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.aggregation(), AggregationType::Sum);
        assert_eq!(listener.registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_record_fans_out() {
        let stats = stats();
        let listener = Arc::new(Counting::default());
        stats.register_exporter(listener.clone());

        let m = stats.create_measure_int64("bytes", "By", "").unwrap();
        let other = stats.create_measure_int64("other", "1", "").unwrap();
        let sum = stats
            .create_and_register_view("bytes_sum", &m, AggregationType::Sum, vec![key("k")], "", None)
            .unwrap();
        let count = stats
            .create_and_register_view("bytes_count", &m, AggregationType::Count, vec![], "", None)
            .unwrap();
        assert_eq!(stats.views_for_measure("bytes").len(), 2);

        let tags: TagMap = vec![(key("k"), TagValue::new("v").unwrap())].into_iter().collect();
        assert!(stats.record(&[m.measurement(3.9), m.measurement(2.0), other.measurement(1.0)], Some(&tags)));

        assert_eq!(
            sum.get_snapshot(&[Some(TagValue::new("v").unwrap())]).map(|d| match d {
                AggregationData::Sum(s) => s.value,
                _ => -1.0,
            }),
            Some(5.0)
        );
        assert_eq!(
            count.get_snapshot(&[]).map(|d| match d {
                AggregationData::Count(c) => c.value,
                _ => 0,
            }),
            Some(2)
        );
        assert_eq!(listener.recorded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_same_name_other_definition_not_fanned_out() {
        let stats = stats();
        let listener = Arc::new(Counting::default());
        stats.register_exporter(listener.clone());

        let m = stats.create_measure_double("load", "1", "").unwrap();
        let view = stats
            .create_and_register_view("load_sum", &m, AggregationType::Sum, vec![], "", None)
            .unwrap();

        let impostor = Measure::new("load", "By", "", MeasureType::Int64).unwrap();
        assert!(stats.record(&[impostor.measurement(4.0)], None));
        assert!(view.get_snapshots().is_empty());
        assert_eq!(listener.recorded.load(Ordering::SeqCst), 0);

        assert!(stats.record(&[m.measurement(4.0)], None));
        assert_eq!(view.get_snapshots().len(), 1);
        assert_eq!(listener.recorded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_batch_rejected_whole() {
        let stats = stats();
        let listener = Arc::new(Counting::default());
        stats.register_exporter(listener.clone());

        let m = stats.create_measure_double("temp", "1", "").unwrap();
        let view = stats
            .create_and_register_view("temp_last", &m, AggregationType::LastValue, vec![], "", None)
            .unwrap();

        let batch = [m.measurement(1.0), m.measurement(-1.0), m.measurement(1.0)];
        assert!(!stats.record(&batch, None));
        assert!(!stats.record(&[m.measurement(std::f64::NAN)], None));
        assert!(view.get_snapshots().is_empty());
        assert_eq!(listener.recorded.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_attachments_reach_exemplars() {
        let stats = stats();
        let m = stats.create_measure_double("latency", "ms", "").unwrap();
        let view = stats
            .create_and_register_view("latency_dist", &m, AggregationType::Distribution, vec![], "", Some(vec![10.0]))
            .unwrap();

        let mut attachments = Attachments::new();
        attachments.insert("trace".to_owned(), "abc".to_owned());
        assert!(stats.record_with_attachments(&[m.measurement(3.0)], None, Some(&attachments)));

        match view.get_snapshot(&[]) {
            Some(AggregationData::Distribution(d)) => {
                let exemplar = d.buckets[0].exemplar.as_ref().unwrap();
                assert_eq!(exemplar.attachments.get("trace").map(String::as_str), Some("abc"));
            },
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[test]
    fn test_unregister_exporter() {
        let stats = stats();
        let counting = Arc::new(Counting::default());
        let listener: Arc<dyn StatsEventListener> = counting.clone();
        stats.register_exporter(listener.clone());
        stats.register_exporter(listener.clone());

        let m = stats.create_measure_double("x", "1", "").unwrap();
        stats
            .create_and_register_view("x_sum", &m, AggregationType::Sum, vec![], "", None)
            .unwrap();
        stats.record(&[m.measurement(1.0)], None);
        assert_eq!(counting.recorded.load(Ordering::SeqCst), 1);

        assert!(stats.unregister_exporter(&listener));
        assert!(!stats.unregister_exporter(&listener));
        stats.record(&[m.measurement(1.0)], None);
        assert_eq!(counting.recorded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_producer_exports_registered_views() {
        let stats = stats();
        let producer = stats.metric_producer();
        let m = stats.create_measure_double("x", "1", "").unwrap();
        let view = stats
            .create_and_register_view("x_sum", &m, AggregationType::Sum, vec![], "", None)
            .unwrap();
        stats
            .create_and_register_view("x_count", &m, AggregationType::Count, vec![], "", None)
            .unwrap();
        assert!(producer.get_metrics().is_empty());

        stats.record(&[m.measurement(2.5)], None);
        let metrics = producer.get_metrics();
        let names: Vec<&str> = metrics.iter().map(|m| m.descriptor.name.as_str()).collect();
        assert_eq!(names, vec!["x_count", "x_sum"]);
        assert_eq!(metrics[1].timeseries[0].start_timestamp, Some(view.start_time()));
        assert_eq!(metrics[1].timeseries[0].points[0].value, PointValue::Double(2.5));
    }

    #[test]
    fn test_clear() {
        let stats = stats();
        stats.register_exporter(Arc::new(Counting::default()));
        let m = stats.create_measure_double("x", "1", "").unwrap();
        stats
            .create_and_register_view("x_sum", &m, AggregationType::Sum, vec![], "", None)
            .unwrap();

        stats.clear();
        assert!(stats.registered_views().is_empty());
        assert!(stats.registered_measures().is_empty());
        assert!(stats.views_for_measure("x").is_empty());
        assert!(stats.record(&[m.measurement(1.0)], None));
    }
}
