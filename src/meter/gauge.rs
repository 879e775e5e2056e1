use super::{Meter, MeterCore, MetricOptions};
use crate::{
    clock::Clock,
    data::{LabelValue, Metric, MetricDescriptorType, Point, PointValue, TimeSeries},
    error::Result,
    hashing::HashStrategy,
    helper::AtomicF64,
    measure::MeasureType,
};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// A settable value of one gauge series.
#[derive(Debug)]
pub struct GaugePoint {
    value: AtomicF64,
    value_type: MeasureType,
}

impl GaugePoint {
    fn new(value_type: MeasureType) -> GaugePoint {
        GaugePoint {
            value: AtomicF64::new(0.0),
            value_type,
        }
    }

    fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            debug!("discarding non-finite gauge update {}", value);
            return None;
        }
        match self.value_type {
            MeasureType::Int64 => Some(value.trunc()),
            MeasureType::Double => Some(value),
        }
    }

    /// Adds `amount`, which may be negative.
    pub fn add(&self, amount: f64) {
        if let Some(amount) = self.normalize(amount) {
            self.value.add(amount);
        }
    }

    pub fn set(&self, value: f64) {
        if let Some(value) = self.normalize(value) {
            self.value.store(value);
        }
    }

    pub fn value(&self) -> f64 {
        self.value.load()
    }

    fn point_value(&self) -> PointValue {
        let value = self.value();
        match self.value_type {
            MeasureType::Int64 => PointValue::Int64(value as i64),
            MeasureType::Double => PointValue::Double(value),
        }
    }
}

struct GaugeSeries {
    label_values: Vec<LabelValue>,
    point: Arc<GaugePoint>,
}

/// A gauge whose series are addressed by explicit label values.
pub struct Gauge {
    core: MeterCore,
    value_type: MeasureType,
    clock: Clock,
    series: RwLock<HashMap<String, GaugeSeries, FnvBuildHasher>>,
}

impl Gauge {
    pub fn new(
        name: &str, options: MetricOptions, value_type: MeasureType, clock: Clock, hash_strategy: HashStrategy,
    ) -> Result<Gauge> {
        let type_ = match value_type {
            MeasureType::Int64 => MetricDescriptorType::GaugeInt64,
            MeasureType::Double => MetricDescriptorType::GaugeDouble,
        };

        Ok(Gauge {
            core: MeterCore::new(name, options, type_, hash_strategy)?,
            value_type,
            clock,
            series: RwLock::new(HashMap::default()),
        })
    }

    /// Returns the point for `label_values`, creating it on first use.
    ///
    /// Repeated calls with the same values return the same point.
    pub fn get_or_create_time_series(&self, label_values: &[LabelValue]) -> Result<Arc<GaugePoint>> {
        let key = self.core.key(label_values)?;
        Ok(self.get_or_insert(key, label_values))
    }

    /// Returns the point whose label values are all unset.
    pub fn get_default_time_series(&self) -> Arc<GaugePoint> {
        let label_values = self.core.default_label_values();
        let key = self.core.raw_key(&label_values);
        self.get_or_insert(key, &label_values)
    }

    fn get_or_insert(&self, key: String, label_values: &[LabelValue]) -> Arc<GaugePoint> {
        if let Some(series) = self.series.read().get(&key) {
            return Arc::clone(&series.point);
        }

        let mut series = self.series.write();
        let value_type = self.value_type;
        let entry = series.entry(key).or_insert_with(|| GaugeSeries {
            label_values: label_values.to_vec(),
            point: Arc::new(GaugePoint::new(value_type)),
        });
        Arc::clone(&entry.point)
    }

    /// Stops exporting the series for `label_values`.  Held points keep working but are no
    /// longer reported.
    pub fn remove_time_series(&self, label_values: &[LabelValue]) -> Result<()> {
        let key = self.core.key(label_values)?;
        self.series.write().remove(&key);
        Ok(())
    }

    pub fn clear(&self) {
        self.series.write().clear();
    }
}

impl Meter for Gauge {
    fn get_metric(&self) -> Option<Metric> {
        let series = self.series.read();
        if series.is_empty() {
            return None;
        }

        let now = self.clock.now();
        let timeseries = series
            .values()
            .map(|s| TimeSeries {
                label_values: self.core.series_labels(&s.label_values),
                points: vec![Point {
                    timestamp: now,
                    value: s.point.point_value(),
                }],
                start_timestamp: None,
            })
            .collect();

        Some(Metric {
            descriptor: self.core.descriptor().clone(),
            timeseries,
        })
    }
}
