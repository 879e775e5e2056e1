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
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A monotonically increasing value of one cumulative series.
#[derive(Debug)]
pub struct CumulativePoint {
    value: AtomicF64,
    value_type: MeasureType,
    start: Mutex<Timestamp>,
    clock: Clock,
}

impl CumulativePoint {
    fn new(value_type: MeasureType, clock: Clock) -> CumulativePoint {
        CumulativePoint {
            value: AtomicF64::new(0.0),
            value_type,
            start: Mutex::new(clock.now()),
            clock,
        }
    }

    pub fn inc(&self) -> Result<()> {
        self.inc_by(1.0)
    }

    /// Adds `amount` to the total.
    ///
    /// Negative and non-finite amounts are rejected and leave the total unchanged.
    pub fn inc_by(&self, amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(MetricsError::NonFiniteValue(amount));
        }
        if amount < 0.0 {
            return Err(MetricsError::NegativeDelta(amount));
        }

        let amount = match self.value_type {
            MeasureType::Int64 => amount.trunc(),
            MeasureType::Double => amount,
        };
        self.value.add(amount);
        Ok(())
    }

    /// Zeroes the total and restarts the accumulation window.
    pub fn reset(&self) {
        let mut start = self.start.lock();
        self.value.store(0.0);
        *start = self.clock.now();
    }

    pub fn value(&self) -> f64 {
        self.value.load()
    }

    pub fn start_timestamp(&self) -> Timestamp {
        *self.start.lock()
    }

    fn snapshot(&self) -> (Timestamp, PointValue) {
        let start = self.start.lock();
        let value = self.value.load();
        let value = match self.value_type {
            MeasureType::Int64 => PointValue::Int64(value as i64),
            MeasureType::Double => PointValue::Double(value),
        };
        (*start, value)
    }
}

struct CumulativeSeries {
    label_values: Vec<LabelValue>,
    point: Arc<CumulativePoint>,
}

/// A cumulative metric whose series are addressed by explicit label values.
pub struct Cumulative {
    core: MeterCore,
    value_type: MeasureType,
    clock: Clock,
    series: RwLock<HashMap<String, CumulativeSeries, FnvBuildHasher>>,
}

impl Cumulative {
    pub fn new(
        name: &str, options: MetricOptions, value_type: MeasureType, clock: Clock, hash_strategy: HashStrategy,
    ) -> Result<Cumulative> {
        let type_ = match value_type {
            MeasureType::Int64 => MetricDescriptorType::CumulativeInt64,
            MeasureType::Double => MetricDescriptorType::CumulativeDouble,
        };

        Ok(Cumulative {
            core: MeterCore::new(name, options, type_, hash_strategy)?,
            value_type,
            clock,
            series: RwLock::new(HashMap::default()),
        })
    }

    pub fn get_or_create_time_series(&self, label_values: &[LabelValue]) -> Result<Arc<CumulativePoint>> {
        let key = self.core.key(label_values)?;
        Ok(self.get_or_insert(key, label_values))
    }

    pub fn get_default_time_series(&self) -> Arc<CumulativePoint> {
        let label_values = self.core.default_label_values();
        let key = self.core.raw_key(&label_values);
        self.get_or_insert(key, &label_values)
    }

    fn get_or_insert(&self, key: String, label_values: &[LabelValue]) -> Arc<CumulativePoint> {
        if let Some(series) = self.series.read().get(&key) {
            return Arc::clone(&series.point);
        }

        let mut series = self.series.write();
        let entry = series.entry(key).or_insert_with(|| CumulativeSeries {
            label_values: label_values.to_vec(),
            point: Arc::new(CumulativePoint::new(self.value_type, self.clock.clone())),
        });
        Arc::clone(&entry.point)
    }

    pub fn remove_time_series(&self, label_values: &[LabelValue]) -> Result<()> {
        let key = self.core.key(label_values)?;
        self.series.write().remove(&key);
        Ok(())
    }

    pub fn clear(&self) {
        self.series.write().clear();
    }
}

impl Meter for Cumulative {
    fn get_metric(&self) -> Option<Metric> {
        let series = self.series.read();
        if series.is_empty() {
            return None;
        }

        let now = self.clock.now();
        let timeseries = series
            .values()
            .map(|s| {
                let (start, value) = s.point.snapshot();
                TimeSeries {
                    label_values: self.core.series_labels(&s.label_values),
                    points: vec![Point { timestamp: now, value }],
                    start_timestamp: Some(start),
                }
            })
            .collect();

        Some(Metric {
            descriptor: self.core.descriptor().clone(),
            timeseries,
        })
    }
}
