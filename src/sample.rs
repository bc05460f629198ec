//! Decoded trackpoints and the immutable stream they are held in.

use chrono::{DateTime, Utc};
use crate::error::IngestError;

/// One trackpoint as handed over by a decoder, before validation.
/// `raw_cadence` is the single-leg value reported by the sensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub elevation: Option<f64>,
    pub heart_rate: Option<u32>,
    pub raw_cadence: Option<u32>,
}

/// One validated trackpoint. Cadence is in full steps/min.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
    pub elevation: Option<f64>,
    pub heart_rate: Option<u32>,
    pub cadence: Option<u32>,
}

/// Optional sensor fields exposed through [`SampleStream::field_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorField {
    HeartRate,
    Cadence,
}

/// Ordered trackpoints in recording order. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleStream {
    samples: Vec<Sample>,
}

impl SampleStream {
    /// Validates decoder output and doubles the raw cadence values.
    pub fn ingest(raw: Vec<RawSample>) -> Result<Self, IngestError> {
        let mut samples = Vec::with_capacity(raw.len());

        for (index, point) in raw.into_iter().enumerate() {
            let latitude = point.latitude.ok_or(IngestError::MissingField { index, field: "latitude" })?;
            let longitude = point.longitude.ok_or(IngestError::MissingField { index, field: "longitude" })?;
            let time = point.time.ok_or(IngestError::MissingField { index, field: "time" })?;

            samples.push(Sample {
                latitude,
                longitude,
                time,
                elevation: point.elevation,
                heart_rate: point.heart_rate,
                cadence: point.raw_cadence.map(|cad| cad.saturating_mul(2)),
            });
        }

        Self::from_samples(samples)
    }

    /// Builds a stream from samples whose cadence is already in final units.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self, IngestError> {
        for (index, sample) in samples.iter().enumerate() {
            if !valid_coordinate(sample.latitude, sample.longitude) {
                return Err(IngestError::InvalidCoordinate {
                    index,
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                });
            }
            if sample.elevation.is_some_and(|ele| !ele.is_finite()) {
                return Err(IngestError::NonFiniteElevation { index });
            }
            if index > 0 && sample.time < samples[index - 1].time {
                return Err(IngestError::TimeWentBackwards { index });
            }
        }

        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Elevations of the samples that carry one, in stream order.
    /// Gaps are skipped, so consecutive values may come from non-adjacent samples.
    pub fn elevation_series(&self) -> impl Iterator<Item = f64> + Clone + '_ {
        self.samples.iter().filter_map(|s| s.elevation)
    }

    /// Per-sample presence and value of a sensor field.
    pub fn field_series(&self, field: SensorField) -> impl Iterator<Item = Option<u32>> + Clone + '_ {
        self.samples.iter().map(move |s| match field {
            SensorField::HeartRate => s.heart_rate,
            SensorField::Cadence => s.cadence,
        })
    }
}

fn valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_690_000_000 + seconds, 0).unwrap()
    }

    pub(crate) fn raw(lat: f64, lon: f64, seconds: i64) -> RawSample {
        RawSample {
            latitude: Some(lat),
            longitude: Some(lon),
            time: Some(at(seconds)),
            ..RawSample::default()
        }
    }

    #[test]
    fn test_ingest_doubles_cadence() {
        let mut point = raw(45.0, 7.0, 0);
        point.raw_cadence = Some(85);
        point.heart_rate = Some(140);

        let stream = SampleStream::ingest(vec![point]).unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.samples()[0].cadence, Some(170));
        assert_eq!(stream.samples()[0].heart_rate, Some(140));
    }

    #[test]
    fn test_ingest_rejects_missing_mandatory_fields() {
        let mut no_time = raw(45.0, 7.0, 10);
        no_time.time = None;
        let err = SampleStream::ingest(vec![raw(45.0, 7.0, 0), no_time]).unwrap_err();
        assert_eq!(err, IngestError::MissingField { index: 1, field: "time" });

        let mut no_lat = raw(45.0, 7.0, 0);
        no_lat.latitude = None;
        let err = SampleStream::ingest(vec![no_lat]).unwrap_err();
        assert_eq!(err, IngestError::MissingField { index: 0, field: "latitude" });
    }

    #[test]
    fn test_ingest_rejects_bad_coordinates_and_elevation() {
        let err = SampleStream::ingest(vec![raw(95.0, 7.0, 0)]).unwrap_err();
        assert!(matches!(err, IngestError::InvalidCoordinate { index: 0, .. }));

        let mut nan_ele = raw(45.0, 7.0, 0);
        nan_ele.elevation = Some(f64::NAN);
        let err = SampleStream::ingest(vec![nan_ele]).unwrap_err();
        assert_eq!(err, IngestError::NonFiniteElevation { index: 0 });
    }

    #[test]
    fn test_ingest_rejects_time_going_backwards() {
        let err = SampleStream::ingest(vec![raw(45.0, 7.0, 10), raw(45.0, 7.0, 5)]).unwrap_err();
        assert_eq!(err, IngestError::TimeWentBackwards { index: 1 });

        // equal timestamps are fine
        assert!(SampleStream::ingest(vec![raw(45.0, 7.0, 10), raw(45.0, 7.0, 10)]).is_ok());
    }

    #[test]
    fn test_empty_stream_is_valid_input() {
        let stream = SampleStream::ingest(Vec::new()).unwrap();
        assert!(stream.is_empty());
        assert_eq!(stream.elevation_series().count(), 0);
    }

    #[test]
    fn test_elevation_series_skips_gaps_and_restarts() {
        let mut points: Vec<RawSample> = (0..4).map(|i| raw(45.0, 7.0, i * 10)).collect();
        points[0].elevation = Some(100.0);
        points[2].elevation = Some(104.0);
        points[3].elevation = Some(101.5);

        let stream = SampleStream::ingest(points).unwrap();
        let series = stream.elevation_series();
        assert_eq!(series.clone().collect::<Vec<_>>(), vec![100.0, 104.0, 101.5]);
        // restartable
        assert_eq!(series.count(), 3);
        assert_eq!(stream.elevation_series().count(), 3);
    }

    #[test]
    fn test_field_series_reports_presence() {
        let mut points: Vec<RawSample> = (0..3).map(|i| raw(45.0, 7.0, i)).collect();
        points[1].heart_rate = Some(150);
        points[2].raw_cadence = Some(80);

        let stream = SampleStream::ingest(points).unwrap();
        let hr: Vec<_> = stream.field_series(SensorField::HeartRate).collect();
        let cad: Vec<_> = stream.field_series(SensorField::Cadence).collect();
        assert_eq!(hr, vec![None, Some(150), None]);
        assert_eq!(cad, vec![None, None, Some(160)]);
    }
}
