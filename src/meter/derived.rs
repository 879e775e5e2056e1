use super::{Meter, MeterCore, MetricOptions};
use crate::{
    clock::{Clock, Timestamp},
    data::{LabelValue, Metric, MetricDescriptorType, Point, PointValue, TimeSeries},
    error::{MetricsError, Result},
    hashing::HashStrategy,
    helper::AtomicF64,
    measure::MeasureType,
};
use fnv::FnvBuildHasher;
use hashbrown::{HashMap, HashSet};
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, HashMap as StdHashMap, VecDeque},
    fmt,
    sync::{
        atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

/// An object a derived series can read its value from.
///
/// An implementation answers exactly one of the three questions.  The answer is probed once when
/// the series is created, in the order `get_value`, `length`, `size`, and only that accessor is
/// used afterwards.
pub trait Observable: Send + Sync {
    fn get_value(&self) -> Option<f64> {
        None
    }

    fn length(&self) -> Option<usize> {
        None
    }

    fn size(&self) -> Option<usize> {
        None
    }
}

impl Observable for AtomicU64 {
    fn get_value(&self) -> Option<f64> {
        Some(self.load(Ordering::Acquire) as f64)
    }
}

impl Observable for AtomicI64 {
    fn get_value(&self) -> Option<f64> {
        Some(self.load(Ordering::Acquire) as f64)
    }
}

impl Observable for AtomicUsize {
    fn get_value(&self) -> Option<f64> {
        Some(self.load(Ordering::Acquire) as f64)
    }
}

impl<T: Send> Observable for Mutex<Vec<T>> {
    fn length(&self) -> Option<usize> {
        Some(self.lock().len())
    }
}

impl<T: Send + Sync> Observable for RwLock<Vec<T>> {
    fn length(&self) -> Option<usize> {
        Some(self.read().len())
    }
}

impl<T: Send> Observable for Mutex<VecDeque<T>> {
    fn length(&self) -> Option<usize> {
        Some(self.lock().len())
    }
}

impl<K: Send, V: Send, S: Send> Observable for Mutex<HashMap<K, V, S>> {
    fn size(&self) -> Option<usize> {
        Some(self.lock().len())
    }
}

impl<K: Send + Sync, V: Send + Sync, S: Send + Sync> Observable for RwLock<HashMap<K, V, S>> {
    fn size(&self) -> Option<usize> {
        Some(self.read().len())
    }
}

impl<K: Send, V: Send, S: Send> Observable for Mutex<StdHashMap<K, V, S>> {
    fn size(&self) -> Option<usize> {
        Some(self.lock().len())
    }
}

impl<K: Send, V: Send> Observable for Mutex<BTreeMap<K, V>> {
    fn size(&self) -> Option<usize> {
        Some(self.lock().len())
    }
}

impl<T: Send, S: Send> Observable for Mutex<HashSet<T, S>> {
    fn size(&self) -> Option<usize> {
        Some(self.lock().len())
    }
}

/// Where a derived series gets its value at export time.
pub enum DerivedSource {
    Function(Box<dyn Fn() -> f64 + Send + Sync>),
    Object(Arc<dyn Observable>),
}

impl DerivedSource {
    pub fn from_fn<F>(f: F) -> DerivedSource
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        DerivedSource::Function(Box::new(f))
    }

    pub fn from_object<O: Observable + 'static>(object: Arc<O>) -> DerivedSource {
        DerivedSource::Object(object)
    }
}

impl fmt::Debug for DerivedSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DerivedSource::Function(_) => f.write_str("DerivedSource::Function"),
            DerivedSource::Object(_) => f.write_str("DerivedSource::Object"),
        }
    }
}

enum Extractor {
    Function(Box<dyn Fn() -> f64 + Send + Sync>),
    Value(Arc<dyn Observable>),
    Length(Arc<dyn Observable>),
    Size(Arc<dyn Observable>),
}

impl Extractor {
    fn resolve(source: DerivedSource) -> Result<Extractor> {
        match source {
            DerivedSource::Function(f) => Ok(Extractor::Function(f)),
            DerivedSource::Object(o) => {
                if o.get_value().is_some() {
                    Ok(Extractor::Value(o))
                } else if o.length().is_some() {
                    Ok(Extractor::Length(o))
                } else if o.size().is_some() {
                    Ok(Extractor::Size(o))
                } else {
                    Err(MetricsError::UnknownSourceType)
                }
            },
        }
    }

    /// Reads the current value.  `None` when the source produced nothing usable.
    fn extract(&self) -> Option<f64> {
        let value = match self {
            Extractor::Function(f) => Some(f()),
            Extractor::Value(o) => o.get_value(),
            Extractor::Length(o) => o.length().map(|n| n as f64),
            Extractor::Size(o) => o.size().map(|n| n as f64),
        };
        value.filter(|v| v.is_finite())
    }
}

struct DerivedSeries {
    label_values: Vec<LabelValue>,
    extractor: Extractor,
    start: Timestamp,
    last: AtomicF64,
}

/// Series bookkeeping shared by `DerivedGauge` and `DerivedCumulative`.
struct DerivedCore {
    core: MeterCore,
    value_type: MeasureType,
    clock: Clock,
    series: RwLock<HashMap<String, Arc<DerivedSeries>, FnvBuildHasher>>,
}

impl DerivedCore {
    fn new(
        name: &str, options: MetricOptions, type_: MetricDescriptorType, value_type: MeasureType, clock: Clock,
        hash_strategy: HashStrategy,
    ) -> Result<DerivedCore> {
        Ok(DerivedCore {
            core: MeterCore::new(name, options, type_, hash_strategy)?,
            value_type,
            clock,
            series: RwLock::new(HashMap::default()),
        })
    }

    fn create_time_series(&self, label_values: &[LabelValue], source: DerivedSource) -> Result<()> {
        let key = self.core.key(label_values)?;
        let extractor = Extractor::resolve(source)?;

        let mut series = self.series.write();
        if series.contains_key(&key) {
            return Err(MetricsError::TimeSeriesExists);
        }
        series.insert(
            key,
            Arc::new(DerivedSeries {
                label_values: label_values.to_vec(),
                extractor,
                start: self.clock.now(),
                last: AtomicF64::new(0.0),
            }),
        );
        Ok(())
    }

    fn remove_time_series(&self, label_values: &[LabelValue]) -> Result<()> {
        let key = self.core.key(label_values)?;
        self.series.write().remove(&key);
        Ok(())
    }

    fn clear(&self) {
        self.series.write().clear();
    }

    fn point_value(&self, value: f64) -> PointValue {
        match self.value_type {
            MeasureType::Int64 => PointValue::Int64(value as i64),
            MeasureType::Double => PointValue::Double(value),
        }
    }

    /// Builds the metric, asking `read` for the exported value and start of each series.
    ///
    /// Sources are read after the series lock is released, so they may touch this meter.
    fn get_metric<F>(&self, read: F) -> Option<Metric>
    where
        F: Fn(&DerivedSeries) -> Option<(f64, Option<Timestamp>)>,
    {
        let series: Vec<Arc<DerivedSeries>> = self.series.read().values().cloned().collect();
        let now = self.clock.now();
        let timeseries: Vec<TimeSeries> = series
            .iter()
            .filter_map(|s| {
                let (value, start_timestamp) = read(s.as_ref())?;
                Some(TimeSeries {
                    label_values: self.core.series_labels(&s.label_values),
                    points: vec![Point {
                        timestamp: now,
                        value: self.point_value(value),
                    }],
                    start_timestamp,
                })
            })
            .collect();

        if timeseries.is_empty() {
            return None;
        }

        Some(Metric {
            descriptor: self.core.descriptor().clone(),
            timeseries,
        })
    }
}

/// A gauge whose series values are read from callbacks or observed objects at export time.
pub struct DerivedGauge {
    inner: DerivedCore,
}

impl DerivedGauge {
    pub fn new(
        name: &str, options: MetricOptions, value_type: MeasureType, clock: Clock, hash_strategy: HashStrategy,
    ) -> Result<DerivedGauge> {
        let type_ = match value_type {
            MeasureType::Int64 => MetricDescriptorType::GaugeInt64,
            MeasureType::Double => MetricDescriptorType::GaugeDouble,
        };

        Ok(DerivedGauge {
            inner: DerivedCore::new(name, options, type_, value_type, clock, hash_strategy)?,
        })
    }

    /// Attaches `source` to the series for `label_values`.
    ///
    /// Fails with `TimeSeriesExists` if the series already has a source, and with
    /// `UnknownSourceType` if an object source answers none of the `Observable` accessors.
    pub fn create_time_series(&self, label_values: &[LabelValue], source: DerivedSource) -> Result<()> {
        self.inner.create_time_series(label_values, source)
    }

    pub fn remove_time_series(&self, label_values: &[LabelValue]) -> Result<()> {
        self.inner.remove_time_series(label_values)
    }

    pub fn clear(&self) {
        self.inner.clear()
    }
}

impl Meter for DerivedGauge {
    fn get_metric(&self) -> Option<Metric> {
        self.inner.get_metric(|s| match s.extractor.extract() {
            Some(value) => Some((value, None)),
            None => {
                debug!("skipping derived gauge series with no usable value");
                None
            },
        })
    }
}

/// A cumulative whose series values are read from callbacks or observed objects at export time.
///
/// A reading lower than the previous export is reported as the previous value, so the exported
/// series never decreases.
pub struct DerivedCumulative {
    inner: DerivedCore,
}

impl DerivedCumulative {
    pub fn new(
        name: &str, options: MetricOptions, value_type: MeasureType, clock: Clock, hash_strategy: HashStrategy,
    ) -> Result<DerivedCumulative> {
        let type_ = match value_type {
            MeasureType::Int64 => MetricDescriptorType::CumulativeInt64,
            MeasureType::Double => MetricDescriptorType::CumulativeDouble,
        };

        Ok(DerivedCumulative {
            inner: DerivedCore::new(name, options, type_, value_type, clock, hash_strategy)?,
        })
    }

    pub fn create_time_series(&self, label_values: &[LabelValue], source: DerivedSource) -> Result<()> {
        self.inner.create_time_series(label_values, source)
    }

    pub fn remove_time_series(&self, label_values: &[LabelValue]) -> Result<()> {
        self.inner.remove_time_series(label_values)
    }

    pub fn clear(&self) {
        self.inner.clear()
    }
}

impl Meter for DerivedCumulative {
    fn get_metric(&self) -> Option<Metric> {
        self.inner.get_metric(|s| {
            let value = match s.extractor.extract() {
                Some(current) => s.last.update(|last| last.max(current)),
                None => s.last.load(),
            };
            Some((value, Some(s.start)))
        })
    }
}
