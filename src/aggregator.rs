//! Single-pass summary statistics over a sample stream.
//!
//! Elevation gain/loss is not computed here; see [`crate::elevation`].

use chrono::{DateTime, Utc};
use geo::{point, HaversineDistance};

use crate::error::{EmptyStreamError, PaceUndefined};
use crate::sample::{Sample, SampleStream, SensorField};

/// Average and maximum of a sensor field over the samples that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorStats {
    pub average: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub start_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub distance_km: f64,
    /// Seconds per km. `None` when the distance is zero.
    pub average_pace: Option<f64>,
    pub heart_rate: Option<SensorStats>,
    pub cadence: Option<SensorStats>,
}

impl StreamSummary {
    pub fn pace(&self) -> Result<f64, PaceUndefined> {
        self.average_pace.ok_or(PaceUndefined)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricAggregator;

impl MetricAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, stream: &SampleStream) -> Result<StreamSummary, EmptyStreamError> {
        let (first, last) = match (stream.first(), stream.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(EmptyStreamError),
        };

        let duration_seconds = seconds_between(first.time, last.time);
        let distance_km = total_distance_m(stream.samples()) / 1000.0;
        let average_pace = pace_seconds_per_km(duration_seconds, distance_km);

        Ok(StreamSummary {
            start_time: first.time,
            duration_seconds,
            distance_km,
            average_pace,
            heart_rate: sensor_stats(stream.field_series(SensorField::HeartRate)),
            cadence: sensor_stats(stream.field_series(SensorField::Cadence)),
        })
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

pub fn pace_seconds_per_km(duration_seconds: f64, distance_km: f64) -> Option<f64> {
    if distance_km > 0.0 {
        Some(duration_seconds / distance_km)
    } else {
        None
    }
}

/// Sum of 3-D distances between consecutive samples, in meters.
pub fn total_distance_m(samples: &[Sample]) -> f64 {
    samples.windows(2).map(|w| segment_distance_m(&w[0], &w[1])).sum()
}

/// Haversine ground distance, turned into slant distance when both ends
/// carry an elevation.
pub fn segment_distance_m(a: &Sample, b: &Sample) -> f64 {
    let from = point!(x: a.longitude, y: a.latitude);
    let to = point!(x: b.longitude, y: b.latitude);
    let ground = from.haversine_distance(&to);

    match (a.elevation, b.elevation) {
        (Some(ele_a), Some(ele_b)) => ground.hypot(ele_b - ele_a),
        _ => ground,
    }
}

/// Integer mean rounded half up, and maximum, over present values.
pub fn sensor_stats<I>(values: I) -> Option<SensorStats>
where
    I: IntoIterator<Item = Option<u32>>,
{
    let mut count: u64 = 0;
    let mut sum: u64 = 0;
    let mut max: u32 = 0;

    for value in values.into_iter().flatten() {
        count += 1;
        sum += u64::from(value);
        max = max.max(value);
    }

    if count == 0 {
        return None;
    }

    // floor(sum / count + 1/2)
    let average = (2 * sum + count) / (2 * count);
    Some(SensorStats {
        average: average as u32,
        max,
    })
}
