//! GPX decoding into [`DecodedTrack`]s.
//!
//! Positions, elevation and time come from the `gpx` crate. Heart rate and
//! cadence live in Garmin TrackPointExtension elements (`gpxtpx:hr`,
//! `gpxtpx:cad`) which the `gpx` crate skips, so a second quick-xml pass over
//! the same document picks them up, one entry per `<trkpt>` in document order.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use gpx::{read, Gpx, Time};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::activity::DecodedTrack;
use crate::sample::RawSample;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot read '{source_id}': {cause}")]
    Io {
        source_id: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("failed to parse GPX '{source_id}': {message}")]
    Gpx { source_id: String, message: String },

    #[error("malformed XML in '{source_id}': {message}")]
    Xml { source_id: String, message: String },

    #[error("invalid timestamp on point {point} of '{source_id}': {message}")]
    Time {
        source_id: String,
        point: usize,
        message: String,
    },

    #[error("invalid {field} extension value '{value}' on point {point} of '{source_id}'")]
    InvalidExtension {
        source_id: String,
        point: usize,
        field: &'static str,
        value: String,
    },

    #[error("'{source_id}': {points} track points but {extensions} extension entries")]
    ExtensionMismatch {
        source_id: String,
        points: usize,
        extensions: usize,
    },
}

/// Sensor values found in one `<trkpt>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PointExtensions {
    heart_rate: Option<u32>,
    cadence: Option<u32>,
}

pub fn read_gpx_file(path: &Path) -> Result<DecodedTrack, ReadError> {
    let source_id = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let file = File::open(path).map_err(|cause| ReadError::Io {
        source_id: source_id.clone(),
        cause,
    })?;

    let mut track = read_gpx(BufReader::new(file), &source_id)?;
    if track.name.is_empty() {
        if let Some(stem) = path.file_stem() {
            track.name = stem.to_string_lossy().to_string();
        }
    }
    Ok(track)
}

pub fn read_gpx<R: Read>(mut reader: R, source_id: &str) -> Result<DecodedTrack, ReadError> {
    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(|cause| ReadError::Io {
        source_id: source_id.to_string(),
        cause,
    })?;

    let gpx = read(content.as_bytes()).map_err(|e| ReadError::Gpx {
        source_id: source_id.to_string(),
        message: e.to_string(),
    })?;

    let extensions = scan_point_extensions(&content, source_id)?;
    decode_track(&gpx, &extensions, source_id)
}

fn decode_track(gpx: &Gpx, extensions: &[PointExtensions], source_id: &str) -> Result<DecodedTrack, ReadError> {
    let points = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter());

    let mut samples = Vec::new();
    for (index, point) in points.enumerate() {
        let time = match &point.time {
            Some(time) => Some(to_utc(time).map_err(|message| ReadError::Time {
                source_id: source_id.to_string(),
                point: index,
                message,
            })?),
            None => None,
        };
        let ext = extensions.get(index).copied().unwrap_or_default();

        samples.push(RawSample {
            latitude: Some(point.point().y()),
            longitude: Some(point.point().x()),
            time,
            elevation: point.elevation,
            heart_rate: ext.heart_rate,
            raw_cadence: ext.cadence,
        });
    }

    if samples.len() != extensions.len() {
        return Err(ReadError::ExtensionMismatch {
            source_id: source_id.to_string(),
            points: samples.len(),
            extensions: extensions.len(),
        });
    }

    // Last named track wins, as with multi-track exports where every track
    // repeats the activity name.
    let name = gpx
        .tracks
        .iter()
        .rev()
        .find_map(|track| track.name.clone())
        .unwrap_or_default();

    let activity_type = gpx
        .tracks
        .iter()
        .find_map(|track| track.type_.clone())
        .or_else(|| {
            gpx.metadata
                .as_ref()
                .and_then(|metadata| metadata.links.iter().find_map(|link| link.type_.clone()))
        })
        .unwrap_or_default();

    Ok(DecodedTrack {
        source_id: source_id.to_string(),
        name,
        activity_type,
        samples,
    })
}

fn to_utc(time: &Time) -> Result<DateTime<Utc>, String> {
    let iso = time.format().map_err(|e| e.to_string())?;
    DateTime::parse_from_rfc3339(&iso)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

fn scan_point_extensions(content: &str, source_id: &str) -> Result<Vec<PointExtensions>, ReadError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut points: Vec<PointExtensions> = Vec::new();
    let mut in_trkpt = false;
    let mut pending: Option<&'static str> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| ReadError::Xml {
            source_id: source_id.to_string(),
            message: e.to_string(),
        })?;

        match event {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => {
                    points.push(PointExtensions::default());
                    in_trkpt = true;
                }
                b"hr" if in_trkpt => pending = Some("hr"),
                b"cad" if in_trkpt => pending = Some("cad"),
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    points.push(PointExtensions::default());
                }
            }
            Event::Text(t) => {
                if let Some(field) = pending.take() {
                    let text = t.unescape().map_err(|e| ReadError::Xml {
                        source_id: source_id.to_string(),
                        message: e.to_string(),
                    })?;
                    let point = points.len().saturating_sub(1);
                    let value = text.trim().parse::<u32>().map_err(|_| ReadError::InvalidExtension {
                        source_id: source_id.to_string(),
                        point,
                        field,
                        value: text.to_string(),
                    })?;

                    if let Some(entry) = points.last_mut() {
                        match field {
                            "hr" => entry.heart_rate = Some(value),
                            _ => entry.cadence = Some(value),
                        }
                    }
                }
            }
            Event::End(e) => {
                pending = None;
                if e.local_name().as_ref() == b"trkpt" {
                    in_trkpt = false;
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(points)
}
