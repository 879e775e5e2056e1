use super::snapshot::{BucketOptions, DistributionValue, Explicit};
use crate::{
    clock::Timestamp,
    error::{MetricsError, Result},
    tags::Attachments,
};
use log::warn;
use serde::Serialize;
use std::sync::Arc;

/// A representative raw sample kept alongside a bucket.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exemplar {
    pub value: f64,
    pub timestamp: Timestamp,
    pub attachments: Attachments,
}

/// One histogram bucket.
///
/// The exemplar is the most recent sample that landed in the bucket and carried attachments.
/// Each such sample replaces the previous one; this is not reservoir sampling.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemplar: Option<Exemplar>,
}

/// Strictly increasing, strictly positive upper bounds of histogram buckets.
///
/// `n` bounds describe `n + 1` buckets: `(-inf, b0)`, `[b0, b1)`, ..., `[bn-1, +inf)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BucketBoundaries {
    bounds: Vec<f64>,
}

impl BucketBoundaries {
    /// Creates bucket boundaries.
    ///
    /// Non-positive boundaries are dropped with a warning.  What remains must be strictly
    /// increasing.
    pub fn new(boundaries: Vec<f64>) -> Result<BucketBoundaries> {
        let total = boundaries.len();
        let bounds: Vec<f64> = boundaries.into_iter().filter(|b| *b > 0.0).collect();
        if bounds.len() < total {
            warn!("dropping {} non-positive bucket boundaries", total - bounds.len());
        }

        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MetricsError::InvalidBucketBoundaries);
        }

        Ok(BucketBoundaries { bounds })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn num_buckets(&self) -> usize {
        self.bounds.len() + 1
    }

    /// Index of the bucket `value` falls in: the position of the first bound strictly greater
    /// than `value`, or the overflow bucket.
    pub fn bucket_index(&self, value: f64) -> usize {
        self.bounds.partition_point(|b| *b <= value)
    }
}

/// Online summary statistics plus explicit-bound histogram.
#[derive(Clone, Debug, PartialEq)]
pub struct DistributionData {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum_of_squared_deviation: f64,
    pub buckets: Vec<Bucket>,
    pub timestamp: Timestamp,
    boundaries: Arc<BucketBoundaries>,
}

impl DistributionData {
    pub fn new(boundaries: Arc<BucketBoundaries>, timestamp: Timestamp) -> DistributionData {
        DistributionData {
            count: 0,
            sum: 0.0,
            min: std::f64::INFINITY,
            max: std::f64::NEG_INFINITY,
            mean: 0.0,
            sum_of_squared_deviation: 0.0,
            buckets: vec![Bucket::default(); boundaries.num_buckets()],
            timestamp,
            boundaries,
        }
    }

    pub fn add_measurement(&mut self, value: f64, timestamp: Timestamp, attachments: Option<&Attachments>) {
        self.timestamp = timestamp;
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        // Welford's online update.
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_of_squared_deviation += delta * (value - self.mean);

        let bucket = &mut self.buckets[self.boundaries.bucket_index(value)];
        bucket.count += 1;
        if let Some(attachments) = attachments {
            bucket.exemplar = Some(Exemplar {
                value,
                timestamp,
                attachments: attachments.clone(),
            });
        }
    }

    pub fn boundaries(&self) -> &BucketBoundaries {
        &self.boundaries
    }

    pub fn std_deviation(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum_of_squared_deviation / self.count as f64).sqrt()
    }

    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    pub fn to_value(&self) -> DistributionValue {
        DistributionValue {
            count: self.count as i64,
            sum: self.sum,
            sum_of_squared_deviation: self.sum_of_squared_deviation,
            bucket_options: BucketOptions {
                explicit: Explicit {
                    bounds: self.boundaries.bounds().to_vec(),
                },
            },
            buckets: self.buckets.clone(),
        }
    }
}
