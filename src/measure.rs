use crate::error::{MetricsError, Result};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeasureType {
    Int64,
    Double,
}

/// The definition of a quantity that can be measured.
///
/// Measures are immutable once created; clones share the same definition.  They are obtained from
/// `Stats::create_measure_int64` or `Stats::create_measure_double`, which keep names unique.
#[derive(Clone, Debug, PartialEq)]
pub struct Measure {
    inner: Arc<MeasureInner>,
}

#[derive(Debug, PartialEq)]
struct MeasureInner {
    name: String,
    description: String,
    unit: String,
    measure_type: MeasureType,
}

impl Measure {
    pub(crate) fn new<N, U, D>(name: N, unit: U, description: D, measure_type: MeasureType) -> Result<Measure>
    where
        N: Into<String>,
        U: Into<String>,
        D: Into<String>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricsError::Missing("measure name"));
        }

        Ok(Measure {
            inner: Arc::new(MeasureInner {
                name,
                description: description.into(),
                unit: unit.into(),
                measure_type,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn unit(&self) -> &str {
        &self.inner.unit
    }

    pub fn measure_type(&self) -> MeasureType {
        self.inner.measure_type
    }

    /// Pairs this measure with a recorded value.
    pub fn measurement(&self, value: f64) -> Measurement {
        Measurement {
            measure: self.clone(),
            value,
        }
    }
}

/// One recorded sample of a measure.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub measure: Measure,
    pub value: f64,
}

impl Measurement {
    /// Checks the value can be recorded: finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(MetricsError::NonFiniteValue(self.value));
        }
        if self.value < 0.0 {
            return Err(MetricsError::NegativeValue(self.value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Measure, MeasureType};
    use crate::error::MetricsError;

    #[test]
    fn test_measure_requires_name() {
        assert_eq!(
            Measure::new("", "ms", "latency", MeasureType::Double),
            Err(MetricsError::Missing("measure name"))
        );
    }

    #[test]
    fn test_measurement_validation() {
        let m = Measure::new("latency", "ms", "request latency", MeasureType::Double).unwrap();
        assert!(m.measurement(0.0).validate().is_ok());
        assert_eq!(m.measurement(-1.0).validate(), Err(MetricsError::NegativeValue(-1.0)));
        assert!(m.measurement(std::f64::NAN).validate().is_err());
        assert!(m.measurement(std::f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_measure_accessors() {
        let d = Measure::new("ratio", "1", "hit ratio", MeasureType::Double).unwrap();
        assert_eq!(d.name(), "ratio");
        assert_eq!(d.unit(), "1");
        assert_eq!(d.description(), "hit ratio");
        assert_eq!(d.measure_type(), MeasureType::Double);
        assert_eq!(d.measurement(2.0).measure, d);
    }
}
