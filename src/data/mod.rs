use crate::{clock::Timestamp, measure::MeasureType, tags::Attachments};
use std::sync::Arc;

pub mod counter;
pub mod distribution;
pub mod gauge;
pub mod snapshot;

pub use self::{
    counter::{CountData, SumData},
    distribution::{Bucket, BucketBoundaries, DistributionData, Exemplar},
    gauge::LastValueData,
    snapshot::{
        BucketOptions, DistributionValue, Explicit, LabelKey, LabelValue, Metric, MetricDescriptor,
        MetricDescriptorType, Point, PointValue, TimeSeries,
    },
};

/// How a view folds measurements together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregationType {
    Count,
    Sum,
    LastValue,
    Distribution,
}

impl AggregationType {
    /// The exported metric kind for this aggregation over a measure of the given type.
    pub fn descriptor_type(self, measure_type: MeasureType) -> MetricDescriptorType {
        match (self, measure_type) {
            (AggregationType::Count, _) => MetricDescriptorType::CumulativeInt64,
            (AggregationType::Sum, MeasureType::Int64) => MetricDescriptorType::CumulativeInt64,
            (AggregationType::Sum, MeasureType::Double) => MetricDescriptorType::CumulativeDouble,
            (AggregationType::LastValue, MeasureType::Int64) => MetricDescriptorType::GaugeInt64,
            (AggregationType::LastValue, MeasureType::Double) => MetricDescriptorType::GaugeDouble,
            (AggregationType::Distribution, _) => MetricDescriptorType::CumulativeDistribution,
        }
    }
}

/// Accumulated state of one series within a view.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregationData {
    Sum(SumData),
    Count(CountData),
    LastValue(LastValueData),
    Distribution(DistributionData),
}

impl AggregationData {
    /// Creates empty state for `aggregation`.
    ///
    /// Distributions without boundaries get a single bucket.
    pub fn new(
        aggregation: AggregationType, boundaries: Option<&Arc<BucketBoundaries>>, timestamp: Timestamp,
    ) -> AggregationData {
        match aggregation {
            AggregationType::Sum => AggregationData::Sum(SumData::new(timestamp)),
            AggregationType::Count => AggregationData::Count(CountData::new(timestamp)),
            AggregationType::LastValue => AggregationData::LastValue(LastValueData::new(timestamp)),
            AggregationType::Distribution => {
                let boundaries = match boundaries {
                    Some(b) => Arc::clone(b),
                    None => Arc::new(BucketBoundaries::default()),
                };
                AggregationData::Distribution(DistributionData::new(boundaries, timestamp))
            },
        }
    }

    pub fn aggregation_type(&self) -> AggregationType {
        match self {
            AggregationData::Sum(_) => AggregationType::Sum,
            AggregationData::Count(_) => AggregationType::Count,
            AggregationData::LastValue(_) => AggregationType::LastValue,
            AggregationData::Distribution(_) => AggregationType::Distribution,
        }
    }

    /// Time of the last update.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            AggregationData::Sum(d) => d.timestamp,
            AggregationData::Count(d) => d.timestamp,
            AggregationData::LastValue(d) => d.timestamp,
            AggregationData::Distribution(d) => d.timestamp,
        }
    }

    pub fn add_measurement(&mut self, value: f64, timestamp: Timestamp, attachments: Option<&Attachments>) {
        match self {
            AggregationData::Sum(d) => d.add_measurement(value, timestamp),
            AggregationData::Count(d) => d.add_measurement(timestamp),
            AggregationData::LastValue(d) => d.add_measurement(value, timestamp),
            AggregationData::Distribution(d) => d.add_measurement(value, timestamp, attachments),
        }
    }

    /// Converts the current state into an export point stamped with `timestamp`.
    pub fn to_point(&self, measure_type: MeasureType, timestamp: Timestamp) -> Point {
        let value = match self {
            AggregationData::Sum(d) => scalar(d.value, measure_type),
            AggregationData::Count(d) => PointValue::Int64(d.value as i64),
            AggregationData::LastValue(d) => scalar(d.value, measure_type),
            AggregationData::Distribution(d) => PointValue::Distribution(d.to_value()),
        };

        Point { timestamp, value }
    }
}

fn scalar(value: f64, measure_type: MeasureType) -> PointValue {
    match measure_type {
        MeasureType::Int64 => PointValue::Int64(value as i64),
        MeasureType::Double => PointValue::Double(value),
    }
}
