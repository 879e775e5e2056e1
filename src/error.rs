use thiserror::Error;

/// Errors raised by registration, recording and export calls.
///
/// Validation errors are returned as soon as a call is made with bad arguments.  Data-quality
/// errors (`NegativeValue`, `NegativeDelta`, `NonFiniteValue`) describe input that was discarded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("missing mandatory {0}")]
    Missing(&'static str),

    #[error("invalid tag key: {0:?}")]
    InvalidTagKey(String),

    #[error("invalid tag value: {0:?}")]
    InvalidTagValue(String),

    #[error("label key at position {0} is empty")]
    InvalidLabelKey(usize),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("labels size mismatch: expected {expected}, got {actual}")]
    LabelsSizeMismatch { expected: usize, actual: usize },

    #[error("a metric with the name {0} has already been registered")]
    AlreadyRegistered(String),

    #[error("time series already exists")]
    TimeSeriesExists,

    #[error("unknown interface/object type")]
    UnknownSourceType,

    #[error("bucket boundaries are required for distribution view {0}")]
    MissingBucketBoundaries(String),

    #[error("bucket boundaries must be strictly increasing")]
    InvalidBucketBoundaries,

    #[error("negative value {0} rejected")]
    NegativeValue(f64),

    #[error("cumulative metrics cannot be decreased (delta {0})")]
    NegativeDelta(f64),

    #[error("non-finite value {0} rejected")]
    NonFiniteValue(f64),
}

/// Result type alias for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

impl MetricsError {
    /// Whether this error describes discarded input rather than a misconfigured call.
    pub fn is_data_quality(&self) -> bool {
        match self {
            MetricsError::NegativeValue(_) | MetricsError::NegativeDelta(_) | MetricsError::NonFiniteValue(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MetricsError;

    #[test]
    fn test_error_messages() {
        let e = MetricsError::LabelsSizeMismatch { expected: 2, actual: 1 };
        assert_eq!(e.to_string(), "labels size mismatch: expected 2, got 1");

        let e = MetricsError::AlreadyRegistered("m".to_owned());
        assert!(e.to_string().contains("already been registered"));
    }

    #[test]
    fn test_data_quality_classification() {
        assert!(MetricsError::NegativeValue(-1.0).is_data_quality());
        assert!(MetricsError::NonFiniteValue(std::f64::NAN).is_data_quality());
        assert!(!MetricsError::TimeSeriesExists.is_data_quality());
    }
}
