use super::distribution::Bucket;
use crate::{clock::Timestamp, tags::TagValue};
use serde::Serialize;

/// The key of an exported label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LabelKey {
    pub key: String,
    pub description: String,
}

impl LabelKey {
    pub fn new<K: Into<String>, D: Into<String>>(key: K, description: D) -> LabelKey {
        LabelKey {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// The value of an exported label.
///
/// A `None` value is the "no value" sentinel: the series has no value for this key, which is
/// distinct from an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LabelValue {
    pub value: Option<String>,
}

impl LabelValue {
    pub fn new<S: Into<String>>(value: S) -> LabelValue {
        LabelValue {
            value: Some(value.into()),
        }
    }

    pub fn unset() -> LabelValue {
        LabelValue { value: None }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl From<Option<TagValue>> for LabelValue {
    fn from(value: Option<TagValue>) -> LabelValue {
        LabelValue {
            value: value.map(|v| v.value().to_owned()),
        }
    }
}

impl<'a> From<&'a str> for LabelValue {
    fn from(value: &'a str) -> LabelValue {
        LabelValue::new(value)
    }
}

/// The kind of points a metric carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricDescriptorType {
    GaugeInt64,
    GaugeDouble,
    GaugeDistribution,
    CumulativeInt64,
    CumulativeDouble,
    CumulativeDistribution,
}

impl MetricDescriptorType {
    /// Whether points of this kind accumulate from a start time.
    pub fn is_cumulative(self) -> bool {
        match self {
            MetricDescriptorType::CumulativeInt64
            | MetricDescriptorType::CumulativeDouble
            | MetricDescriptorType::CumulativeDistribution => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub name: String,
    pub description: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub type_: MetricDescriptorType,
    pub label_keys: Vec<LabelKey>,
}

/// Explicit bucket bounds of a distribution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Explicit {
    pub bounds: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BucketOptions {
    pub explicit: Explicit,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionValue {
    pub count: i64,
    pub sum: f64,
    pub sum_of_squared_deviation: f64,
    pub bucket_options: BucketOptions,
    pub buckets: Vec<Bucket>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointValue {
    Int64(i64),
    Double(f64),
    Distribution(DistributionValue),
}

impl PointValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PointValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PointValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&DistributionValue> {
        match self {
            PointValue::Distribution(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Point {
    pub timestamp: Timestamp,
    pub value: PointValue,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub label_values: Vec<LabelValue>,
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Timestamp>,
}

/// A point-in-time export of one metric and all of its series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metric {
    pub descriptor: MetricDescriptor,
    pub timeseries: Vec<TimeSeries>,
}

impl Metric {
    /// Finds the series whose label values match exactly.
    pub fn series(&self, label_values: &[LabelValue]) -> Option<&TimeSeries> {
        self.timeseries.iter().find(|ts| ts.label_values.as_slice() == label_values)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LabelKey, LabelValue, Metric, MetricDescriptor, MetricDescriptorType, Point, PointValue, TimeSeries,
    };
    use crate::{clock::Timestamp, tags::TagValue};

    fn metric(start: Option<Timestamp>) -> Metric {
        Metric {
            descriptor: MetricDescriptor {
                name: "requests".to_owned(),
                description: "request count".to_owned(),
                unit: "1".to_owned(),
                type_: MetricDescriptorType::CumulativeInt64,
                label_keys: vec![LabelKey::new("method", "")],
            },
            timeseries: vec![TimeSeries {
                label_values: vec![LabelValue::unset()],
                points: vec![Point {
                    timestamp: Timestamp::new(10, 5),
                    value: PointValue::Int64(3),
                }],
                start_timestamp: start,
            }],
        }
    }

    #[test]
    fn test_label_value_sentinel() {
        assert_eq!(LabelValue::from(None::<TagValue>), LabelValue::unset());
        assert!(!LabelValue::unset().is_set());

        let tv = TagValue::new("GET").unwrap();
        assert_eq!(LabelValue::from(Some(tv)), LabelValue::new("GET"));
        assert_ne!(LabelValue::new(""), LabelValue::unset());
    }

    #[test]
    fn test_metric_serialized_shape() {
        let json = serde_json::to_value(&metric(Some(Timestamp::new(1, 0)))).unwrap();
        assert_eq!(json["descriptor"]["type"], "CUMULATIVE_INT64");
        assert_eq!(json["descriptor"]["labelKeys"][0]["key"], "method");
        assert!(json["timeseries"][0]["labelValues"][0]["value"].is_null());
        assert_eq!(json["timeseries"][0]["points"][0]["value"], 3);
        assert_eq!(json["timeseries"][0]["startTimestamp"]["seconds"], 1);

        let json = serde_json::to_value(&metric(None)).unwrap();
        assert!(json["timeseries"][0].get("startTimestamp").is_none());
    }

    #[test]
    fn test_series_lookup() {
        let m = metric(None);
        assert!(m.series(&[LabelValue::unset()]).is_some());
        assert!(m.series(&[LabelValue::new("GET")]).is_none());
    }

    #[test]
    fn test_descriptor_kind() {
        assert!(MetricDescriptorType::CumulativeDistribution.is_cumulative());
        assert!(!MetricDescriptorType::GaugeDouble.is_cumulative());
    }
}
