//! Activity composition: ingestion, aggregation and elevation accounting
//! merged into one immutable metrics snapshot.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::aggregator::{MetricAggregator, SensorStats, StreamSummary};
use crate::elevation::{ElevationOutcome, ElevationStrategy};
use crate::error::{ActivityError, PaceUndefined, Stage};
use crate::sample::{RawSample, SampleStream};

/// Decoder output for one recorded workout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTrack {
    /// File name or any other identifier used in error reports.
    pub source_id: String,
    pub name: String,
    pub activity_type: String,
    pub samples: Vec<RawSample>,
}

impl DecodedTrack {
    pub fn new(source_id: impl Into<String>, samples: Vec<RawSample>) -> Self {
        Self {
            source_id: source_id.into(),
            samples,
            ..Self::default()
        }
    }
}

/// Summary metrics of one activity. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityMetrics {
    source_id: String,
    name: String,
    activity_type: String,
    sample_count: usize,
    start_time: DateTime<Utc>,
    duration_seconds: f64,
    distance_km: f64,
    average_pace: Option<f64>,
    elevation: ElevationOutcome,
    heart_rate: Option<SensorStats>,
    cadence: Option<SensorStats>,
}

impl ActivityMetrics {
    fn from_parts(track_info: TrackInfo, sample_count: usize, summary: StreamSummary, elevation: ElevationOutcome) -> Self {
        Self {
            source_id: track_info.source_id,
            name: track_info.name,
            activity_type: track_info.activity_type,
            sample_count,
            start_time: summary.start_time,
            duration_seconds: summary.duration_seconds,
            distance_km: summary.distance_km,
            average_pace: summary.average_pace,
            elevation,
            heart_rate: summary.heart_rate,
            cadence: summary.cadence,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Timestamp of the first sample.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Seconds per km.
    pub fn average_pace(&self) -> Result<f64, PaceUndefined> {
        self.average_pace.ok_or(PaceUndefined)
    }

    pub fn elevation(&self) -> ElevationOutcome {
        self.elevation
    }

    pub fn elevation_gain(&self) -> Option<f64> {
        self.elevation.gain()
    }

    pub fn elevation_loss(&self) -> Option<f64> {
        self.elevation.loss()
    }

    pub fn average_heart_rate(&self) -> Option<u32> {
        self.heart_rate.map(|hr| hr.average)
    }

    pub fn max_heart_rate(&self) -> Option<u32> {
        self.heart_rate.map(|hr| hr.max)
    }

    pub fn average_cadence(&self) -> Option<u32> {
        self.cadence.map(|cad| cad.average)
    }

    pub fn max_cadence(&self) -> Option<u32> {
        self.cadence.map(|cad| cad.max)
    }
}

struct TrackInfo {
    source_id: String,
    name: String,
    activity_type: String,
}

/// Builder pairing a decoded track with the elevation strategy to use.
/// Defaults to the cumulative strategy.
#[derive(Debug, Clone)]
pub struct Activity {
    track: DecodedTrack,
    strategy: ElevationStrategy,
}

impl Activity {
    pub fn new(track: DecodedTrack) -> Self {
        Self {
            track,
            strategy: ElevationStrategy::default(),
        }
    }

    pub fn with_elevation_strategy(mut self, strategy: impl Into<ElevationStrategy>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn set_elevation_strategy(&mut self, strategy: impl Into<ElevationStrategy>) {
        self.strategy = strategy.into();
    }

    pub fn elevation_strategy(&self) -> &ElevationStrategy {
        &self.strategy
    }

    pub fn build(self) -> Result<ActivityMetrics, ActivityError> {
        build_activity(self.track, &self.strategy)
    }
}

/// Builds the metrics snapshot for one track.
///
/// The aggregation pass and the elevation pass only read the stream, so they
/// run side by side. Any failure aborts the whole construction.
pub fn build_activity(track: DecodedTrack, strategy: &ElevationStrategy) -> Result<ActivityMetrics, ActivityError> {
    let DecodedTrack {
        source_id,
        name,
        activity_type,
        samples,
    } = track;

    let stream = match SampleStream::ingest(samples) {
        Ok(stream) => stream,
        Err(e) => return Err(ActivityError::new(source_id, Stage::Ingest, e)),
    };

    let (summary, elevation) = rayon::join(
        || MetricAggregator::new().aggregate(&stream),
        || strategy.calculate(stream.elevation_series()),
    );

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => return Err(ActivityError::new(source_id, Stage::Aggregate, e)),
    };
    let elevation = match elevation {
        Ok(elevation) => elevation,
        Err(e) => return Err(ActivityError::new(source_id, Stage::Elevation, e)),
    };

    debug!(
        source = %source_id,
        samples = stream.len(),
        distance_km = summary.distance_km,
        strategy = %strategy.describe(),
        "built activity"
    );

    let info = TrackInfo {
        source_id,
        name,
        activity_type,
    };
    Ok(ActivityMetrics::from_parts(info, stream.len(), summary, elevation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::{CumulativeElevationStrategy, ThresholdElevationStrategy};
    use crate::error::{EmptyStreamError, IngestError, StageError};
    use crate::sample::tests::raw;

    fn scenario_track() -> DecodedTrack {
        let elevations = [100.0, 105.0, 103.0];
        let samples = elevations
            .iter()
            .enumerate()
            .map(|(i, &ele)| {
                let mut point = raw(46.0 + i as f64 * 0.002, 8.0, i as i64 * 60);
                point.elevation = Some(ele);
                point
            })
            .collect();

        DecodedTrack {
            source_id: "scenario.gpx".to_string(),
            name: "Lunch Run".to_string(),
            activity_type: "running".to_string(),
            samples,
        }
    }

    #[test]
    fn test_default_strategy_is_cumulative() {
        let metrics = Activity::new(scenario_track()).build().unwrap();
        assert!((metrics.elevation_gain().unwrap() - 5.0).abs() < 1e-9);
        assert!((metrics.elevation_loss().unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(metrics.name(), "Lunch Run");
        assert_eq!(metrics.activity_type(), "running");
        assert_eq!(metrics.sample_count(), 3);
        assert_eq!(metrics.duration_seconds(), 120.0);
    }

    #[test]
    fn test_threshold_strategy_via_setter() {
        let mut activity = Activity::new(scenario_track());
        activity.set_elevation_strategy(ThresholdElevationStrategy::new(3.0).unwrap());
        let metrics = activity.build().unwrap();
        assert!((metrics.elevation_gain().unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(metrics.elevation_loss(), Some(0.0));
    }

    #[test]
    fn test_empty_track_reports_empty_stream() {
        let err = build_activity(DecodedTrack::new("empty.gpx", Vec::new()), &ElevationStrategy::default())
            .unwrap_err();
        assert_eq!(err.stage, Stage::Aggregate);
        assert_eq!(err.cause, StageError::EmptyStream(EmptyStreamError));
        assert_eq!(err.source_id, "empty.gpx");
    }

    #[test]
    fn test_ingest_failure_is_tagged() {
        let mut track = scenario_track();
        track.samples[1].longitude = None;
        let err = build_activity(track, &ElevationStrategy::default()).unwrap_err();
        assert_eq!(err.stage, Stage::Ingest);
        assert_eq!(
            err.cause,
            StageError::Ingest(IngestError::MissingField { index: 1, field: "longitude" })
        );
    }

    #[test]
    fn test_no_heart_rate_leaves_fields_absent() {
        let metrics = build_activity(scenario_track(), &ElevationStrategy::default()).unwrap();
        assert_eq!(metrics.average_heart_rate(), None);
        assert_eq!(metrics.max_heart_rate(), None);
        assert_eq!(metrics.average_cadence(), None);
        assert!(metrics.distance_km() > 0.0);
        assert!(metrics.average_pace().is_ok());
    }

    #[test]
    fn test_identical_points_pace_undefined() {
        let track = DecodedTrack::new("still.gpx", vec![raw(45.0, 7.0, 0), raw(45.0, 7.0, 30)]);
        let metrics = build_activity(track, &ElevationStrategy::default()).unwrap();
        assert_eq!(metrics.distance_km(), 0.0);
        assert_eq!(metrics.average_pace(), Err(PaceUndefined));
    }

    #[test]
    fn test_missing_elevation_is_undetermined() {
        let track = DecodedTrack::new("flat.gpx", vec![raw(45.0, 7.0, 0), raw(45.001, 7.0, 30)]);
        let metrics = build_activity(track, &ElevationStrategy::default()).unwrap();
        assert!(metrics.elevation().is_undetermined());
        assert_eq!(metrics.elevation_gain(), None);
        assert_eq!(metrics.elevation_loss(), None);
    }

    #[test]
    fn test_composition_matches_direct_computation() {
        let mut track = scenario_track();
        track.samples[0].heart_rate = Some(130);
        track.samples[2].heart_rate = Some(155);
        track.samples[1].raw_cadence = Some(88);

        let stream = SampleStream::ingest(track.samples.clone()).unwrap();
        let summary = MetricAggregator::new().aggregate(&stream).unwrap();
        let strategy = ElevationStrategy::from(CumulativeElevationStrategy::new());
        let elevation = strategy.calculate(stream.elevation_series()).unwrap();

        let metrics = Activity::new(track).with_elevation_strategy(strategy).build().unwrap();
        assert_eq!(metrics.start_time(), summary.start_time);
        assert_eq!(metrics.duration_seconds(), summary.duration_seconds);
        assert_eq!(metrics.distance_km(), summary.distance_km);
        assert_eq!(metrics.average_pace().ok(), summary.average_pace);
        assert_eq!(metrics.elevation(), elevation);
        assert_eq!(metrics.average_heart_rate(), Some(143));
        assert_eq!(metrics.max_heart_rate(), Some(155));
        assert_eq!(metrics.max_cadence(), Some(176));
    }
}
