use crate::{
    data::{LabelKey, LabelValue, Metric, MetricDescriptor, MetricDescriptorType},
    error::{MetricsError, Result},
    hashing::HashStrategy,
};

mod cumulative;
mod derived;
mod gauge;
mod registry;

pub use self::{
    cumulative::{Cumulative, CumulativePoint},
    derived::{DerivedCumulative, DerivedGauge, DerivedSource, Observable},
    gauge::{Gauge, GaugePoint},
    registry::MetricRegistry,
};

/// Anything that can export its current state as a metric.
pub trait Meter: Send + Sync {
    /// Returns `None` when there are no series to export.
    fn get_metric(&self) -> Option<Metric>;
}

/// Descriptive options for meters created through a `MetricRegistry`.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricOptions {
    pub(crate) description: String,
    pub(crate) unit: String,
    pub(crate) label_keys: Vec<LabelKey>,
    pub(crate) constant_labels: Vec<(LabelKey, LabelValue)>,
}

impl Default for MetricOptions {
    fn default() -> MetricOptions {
        MetricOptions {
            description: String::new(),
            unit: "1".to_owned(),
            label_keys: Vec::new(),
            constant_labels: Vec::new(),
        }
    }
}

impl MetricOptions {
    pub fn new() -> MetricOptions {
        Default::default()
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the unit.
    ///
    /// Defaults to `"1"`, the dimensionless unit.
    pub fn unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the label keys every series must supply values for, in order.
    pub fn label_keys(mut self, label_keys: Vec<LabelKey>) -> Self {
        self.label_keys = label_keys;
        self
    }

    /// Adds a label whose value is appended to every series.
    pub fn constant_label(mut self, key: LabelKey, value: LabelValue) -> Self {
        self.constant_labels.push((key, value));
        self
    }
}

/// Descriptor and label bookkeeping shared by the directly addressed meters.
#[derive(Debug)]
pub(crate) struct MeterCore {
    descriptor: MetricDescriptor,
    label_keys_len: usize,
    constant_values: Vec<LabelValue>,
    hash_strategy: HashStrategy,
}

impl MeterCore {
    pub(crate) fn new(
        name: &str, options: MetricOptions, type_: MetricDescriptorType, hash_strategy: HashStrategy,
    ) -> Result<MeterCore> {
        if name.is_empty() {
            return Err(MetricsError::Missing("metric name"));
        }

        let label_keys_len = options.label_keys.len();
        let mut label_keys = options.label_keys;
        let mut constant_values = Vec::with_capacity(options.constant_labels.len());
        for (key, value) in options.constant_labels {
            label_keys.push(key);
            constant_values.push(value);
        }

        for (i, key) in label_keys.iter().enumerate() {
            if key.key.is_empty() {
                return Err(MetricsError::InvalidLabelKey(i));
            }
            if label_keys[..i].iter().any(|k| k.key == key.key) {
                return Err(MetricsError::DuplicateKey(key.key.clone()));
            }
        }

        Ok(MeterCore {
            descriptor: MetricDescriptor {
                name: name.to_owned(),
                description: options.description,
                unit: options.unit,
                type_,
                label_keys,
            },
            label_keys_len,
            constant_values,
            hash_strategy,
        })
    }

    pub(crate) fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    /// Validates `label_values` against the label keys and returns the series key.
    pub(crate) fn key(&self, label_values: &[LabelValue]) -> Result<String> {
        if label_values.len() != self.label_keys_len {
            return Err(MetricsError::LabelsSizeMismatch {
                expected: self.label_keys_len,
                actual: label_values.len(),
            });
        }
        Ok(self.raw_key(label_values))
    }

    /// Series key for values already known to have the right length.
    pub(crate) fn raw_key(&self, label_values: &[LabelValue]) -> String {
        self.hash_strategy.key(label_values)
    }

    pub(crate) fn default_label_values(&self) -> Vec<LabelValue> {
        vec![LabelValue::unset(); self.label_keys_len]
    }

    /// The exported label values of a series: its own values followed by the constant ones.
    pub(crate) fn series_labels(&self, label_values: &[LabelValue]) -> Vec<LabelValue> {
        let mut labels = Vec::with_capacity(label_values.len() + self.constant_values.len());
        labels.extend_from_slice(label_values);
        labels.extend_from_slice(&self.constant_values);
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::{MeterCore, MetricOptions};
    use crate::{
        data::{LabelKey, LabelValue, MetricDescriptorType},
        error::MetricsError,
        hashing::HashStrategy,
    };

    fn core(options: MetricOptions) -> Result<MeterCore, MetricsError> {
        MeterCore::new("m", options, MetricDescriptorType::GaugeInt64, HashStrategy::default())
    }

    #[test]
    fn test_options_defaults() {
        let options = MetricOptions::new();
        assert_eq!(options.unit, "1");
        assert!(options.label_keys.is_empty());
    }

    #[test]
    fn test_core_validation() {
        assert_eq!(
            MeterCore::new("", MetricOptions::new(), MetricDescriptorType::GaugeInt64, HashStrategy::default()).err(),
            Some(MetricsError::Missing("metric name"))
        );

        let options = MetricOptions::new().label_keys(vec![LabelKey::new("a", ""), LabelKey::new("", "")]);
        assert_eq!(core(options).err(), Some(MetricsError::InvalidLabelKey(1)));

        let options = MetricOptions::new()
            .label_keys(vec![LabelKey::new("a", "")])
            .constant_label(LabelKey::new("a", ""), LabelValue::new("x"));
        assert_eq!(core(options).err(), Some(MetricsError::DuplicateKey("a".to_owned())));
    }

    #[test]
    fn test_constant_labels_appended() {
        let options = MetricOptions::new()
            .description("queue depth")
            .label_keys(vec![LabelKey::new("queue", "")])
            .constant_label(LabelKey::new("host", ""), LabelValue::new("h1"));
        let core = core(options).unwrap();

        let keys: Vec<&str> = core.descriptor().label_keys.iter().map(|k| k.key.as_str()).collect();
        assert_eq!(keys, vec!["queue", "host"]);
        assert_eq!(
            core.series_labels(&[LabelValue::new("q1")]),
            vec![LabelValue::new("q1"), LabelValue::new("h1")]
        );
        assert_eq!(core.default_label_values(), vec![LabelValue::unset()]);
        assert_eq!(
            core.key(&[]),
            Err(MetricsError::LabelsSizeMismatch { expected: 1, actual: 0 })
        );
    }
}
