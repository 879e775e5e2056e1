//! In-process stats and metrics core.
//!
//! Measurements of a `Measure` are recorded through `Stats` with a set of tags and aggregated by
//! every registered `View` of that measure into per-tag-vector sums, counts, last values or
//! distributions.  Directly addressed gauges and cumulatives live in a `MetricRegistry`.  Both
//! export `Metric` snapshots through `MetricProducer`s gathered by a `MetricProducerManager`.
//!
//! A `MetricsContext`, built from a `Configuration`, wires all of this together around one clock.
pub mod clock;
mod configuration;
mod context;
pub mod data;
mod error;
pub mod hashing;
mod helper;
mod listener;
mod measure;
pub mod meter;
mod producer;
mod stats;
pub mod tags;
mod view;

pub use self::{
    clock::{Clock, Timestamp},
    configuration::Configuration,
    context::MetricsContext,
    data::{AggregationData, AggregationType, Metric},
    error::{MetricsError, Result},
    hashing::HashStrategy,
    listener::{ChannelListener, StatsEvent, StatsEventListener},
    measure::{Measure, MeasureType, Measurement},
    meter::{
        Cumulative, CumulativePoint, DerivedCumulative, DerivedGauge, DerivedSource, Gauge, GaugePoint, Meter,
        MetricOptions, MetricRegistry, Observable,
    },
    producer::{MetricProducer, MetricProducerManager},
    stats::Stats,
    tags::{Attachments, TagKey, TagMap, TagValue},
    view::{SeriesSnapshot, View},
};
