//! Summary metrics for recorded running workouts: duration, distance, pace,
//! heart rate, cadence and elevation gain/loss with a selectable elevation
//! strategy.

pub mod activity;
pub mod aggregator;
pub mod elevation;
pub mod error;
pub mod gpx_reader;
pub mod overview;
pub mod sample;

pub use activity::{build_activity, Activity, ActivityMetrics, DecodedTrack};
pub use aggregator::{MetricAggregator, SensorStats, StreamSummary};
pub use elevation::{
    CumulativeElevationStrategy, ElevationOutcome, ElevationStrategy, ThresholdElevationStrategy,
};
pub use error::{
    ActivityError, ConfigError, ElevationError, EmptyStreamError, IngestError, PaceUndefined,
    Stage, StageError,
};
pub use sample::{RawSample, Sample, SampleStream, SensorField};
