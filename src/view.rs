use crate::{
    clock::{Clock, Timestamp},
    data::{AggregationData, AggregationType, BucketBoundaries, LabelKey, LabelValue, Metric, MetricDescriptor, TimeSeries},
    error::{MetricsError, Result},
    hashing::HashStrategy,
    measure::{Measure, MeasureType, Measurement},
    meter::Meter,
    tags::{Attachments, TagKey, TagMap, TagValue},
};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

struct Series {
    label_values: Vec<LabelValue>,
    data: Mutex<AggregationData>,
}

/// A copy of one series' accumulated state.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesSnapshot {
    pub label_values: Vec<LabelValue>,
    pub data: AggregationData,
}

/// An aggregation of one measure, broken down by a fixed list of tag keys.
///
/// Each distinct combination of values for the view's columns gets its own series, created on
/// first use.  Recording locks only the series being updated; exporting copies each series under
/// its own lock, so an export never sees a half-applied update.
pub struct View {
    name: String,
    description: String,
    measure: Measure,
    aggregation: AggregationType,
    columns: Vec<TagKey>,
    boundaries: Option<Arc<BucketBoundaries>>,
    start_time: Timestamp,
    registered: AtomicBool,
    clock: Clock,
    hash_strategy: HashStrategy,
    series: RwLock<HashMap<String, Arc<Series>, FnvBuildHasher>>,
}

impl View {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: &str, measure: Measure, aggregation: AggregationType, columns: Vec<TagKey>, description: &str,
        bucket_boundaries: Option<Vec<f64>>, clock: Clock, hash_strategy: HashStrategy,
    ) -> Result<View> {
        if name.is_empty() {
            return Err(MetricsError::Missing("view name"));
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(MetricsError::DuplicateKey(column.name().to_owned()));
            }
        }

        let boundaries = match (aggregation, bucket_boundaries) {
            (AggregationType::Distribution, None) => return Err(MetricsError::MissingBucketBoundaries(name.to_owned())),
            (AggregationType::Distribution, Some(bounds)) => Some(Arc::new(BucketBoundaries::new(bounds)?)),
            (_, _) => None,
        };

        let start_time = clock.now();

        Ok(View {
            name: name.to_owned(),
            description: description.to_owned(),
            measure,
            aggregation,
            columns,
            boundaries,
            start_time,
            registered: AtomicBool::new(false),
            clock,
            hash_strategy,
            series: RwLock::new(HashMap::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    pub fn aggregation(&self) -> AggregationType {
        self.aggregation
    }

    pub fn columns(&self) -> &[TagKey] {
        &self.columns
    }

    pub fn bucket_boundaries(&self) -> Option<&BucketBoundaries> {
        self.boundaries.as_ref().map(|b| &**b)
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Marks the view registered, returning `true` only for the first call.
    pub(crate) fn mark_registered(&self) -> bool {
        !self.registered.swap(true, Ordering::AcqRel)
    }

    /// Records a measurement under the tags in `tags` that match this view's columns.
    ///
    /// Columns missing from `tags` are recorded as unset.
    pub fn record_measurement(
        &self, measurement: &Measurement, tags: &TagMap, attachments: Option<&Attachments>,
    ) -> Result<()> {
        measurement.validate()?;
        let tag_values = tags.project(&self.columns);
        self.record_values(&tag_values, measurement.value, attachments)
    }

    /// Records `value` under an explicit, column-ordered tag vector.
    pub fn record_values(
        &self, tag_values: &[Option<TagValue>], value: f64, attachments: Option<&Attachments>,
    ) -> Result<()> {
        if tag_values.len() != self.columns.len() {
            return Err(MetricsError::LabelsSizeMismatch {
                expected: self.columns.len(),
                actual: tag_values.len(),
            });
        }
        if !value.is_finite() {
            return Err(MetricsError::NonFiniteValue(value));
        }
        if value < 0.0 {
            return Err(MetricsError::NegativeValue(value));
        }

        let value = match self.measure.measure_type() {
            MeasureType::Int64 => value.trunc(),
            MeasureType::Double => value,
        };

        let label_values = to_label_values(tag_values);
        let now = self.clock.now();
        let series = self.get_or_create_series(label_values, now);
        series.data.lock().add_measurement(value, now, attachments);
        Ok(())
    }

    fn get_or_create_series(&self, label_values: Vec<LabelValue>, now: Timestamp) -> Arc<Series> {
        let key = self.hash_strategy.key(&label_values);
        if let Some(series) = self.series.read().get(&key) {
            return Arc::clone(series);
        }

        let mut series = self.series.write();
        let entry = series.entry(key).or_insert_with(|| {
            Arc::new(Series {
                data: Mutex::new(AggregationData::new(self.aggregation, self.boundaries.as_ref(), now)),
                label_values,
            })
        });
        Arc::clone(entry)
    }

    /// Copies the state of the series for `tag_values`, if anything was recorded under it.
    pub fn get_snapshot(&self, tag_values: &[Option<TagValue>]) -> Option<AggregationData> {
        let key = self.hash_strategy.key(&to_label_values(tag_values));
        let series = self.series.read().get(&key).cloned()?;
        let data = series.data.lock().clone();
        Some(data)
    }

    /// Copies the state of every series.
    pub fn get_snapshots(&self) -> Vec<SeriesSnapshot> {
        let series: Vec<Arc<Series>> = self.series.read().values().cloned().collect();
        series
            .iter()
            .map(|s| SeriesSnapshot {
                label_values: s.label_values.clone(),
                data: s.data.lock().clone(),
            })
            .collect()
    }

    pub fn descriptor(&self) -> MetricDescriptor {
        MetricDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            unit: self.measure.unit().to_owned(),
            type_: self.aggregation.descriptor_type(self.measure.measure_type()),
            label_keys: self.columns.iter().map(|c| LabelKey::new(c.name(), "")).collect(),
        }
    }

    /// Exports every series as a metric.
    ///
    /// Cumulative series carry `start` as their start timestamp; last-value series carry none.
    /// Returns `None` until something has been recorded.
    pub fn get_metric(&self, start: Timestamp) -> Option<Metric> {
        self.build_metric(start)
    }

    fn build_metric(&self, start: Timestamp) -> Option<Metric> {
        let snapshots = self.get_snapshots();
        if snapshots.is_empty() {
            return None;
        }

        let descriptor = self.descriptor();
        let start_timestamp = if descriptor.type_.is_cumulative() { Some(start) } else { None };
        let measure_type = self.measure.measure_type();
        let now = self.clock.now();

        let timeseries = snapshots
            .into_iter()
            .map(|s| TimeSeries {
                points: vec![s.data.to_point(measure_type, now)],
                label_values: s.label_values,
                start_timestamp,
            })
            .collect();

        Some(Metric { descriptor, timeseries })
    }
}

impl Meter for View {
    fn get_metric(&self) -> Option<Metric> {
        self.build_metric(self.start_time)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("measure", &self.measure.name())
            .field("aggregation", &self.aggregation)
            .field("columns", &self.columns)
            .field("registered", &self.is_registered())
            .finish()
    }
}

fn to_label_values(tag_values: &[Option<TagValue>]) -> Vec<LabelValue> {
    tag_values.iter().cloned().map(LabelValue::from).collect()
}
