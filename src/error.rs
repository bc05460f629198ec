//! Error types for activity construction.
//!
//! Every failure while building an activity ends up wrapped in an
//! [`ActivityError`] that names the source, the stage that failed and the
//! underlying cause.

use std::fmt;
use thiserror::Error;

/// A decoded sample that cannot enter a [`crate::sample::SampleStream`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("sample {index} is missing mandatory field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("sample {index} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("sample {index} has a non-finite elevation")]
    NonFiniteElevation { index: usize },

    #[error("sample {index} is timestamped before the sample preceding it")]
    TimeWentBackwards { index: usize },
}

/// The stream holds no samples, so duration and distance have no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sample stream is empty")]
pub struct EmptyStreamError;

/// Distance is exactly zero; pace has no defined value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pace is undefined for a zero-distance activity")]
pub struct PaceUndefined;

/// Invalid elevation strategy configuration, rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("elevation threshold must not be negative, got {0}")]
    NegativeThreshold(f64),

    #[error("elevation threshold must be finite")]
    NonFiniteThreshold,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElevationError {
    #[error("elevation value {index} in the series is not finite")]
    NonFiniteValue { index: usize },
}

/// Stage of activity construction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Aggregate,
    Elevation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::Aggregate => "aggregate",
            Stage::Elevation => "elevation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    EmptyStream(#[from] EmptyStreamError),

    #[error(transparent)]
    Elevation(#[from] ElevationError),
}

/// Construction of an activity failed; nothing partial was produced.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{source_id}: {stage} stage failed: {cause}")]
pub struct ActivityError {
    pub source_id: String,
    pub stage: Stage,
    #[source]
    pub cause: StageError,
}

impl ActivityError {
    pub fn new(source_id: impl Into<String>, stage: Stage, cause: impl Into<StageError>) -> Self {
        Self {
            source_id: source_id.into(),
            stage,
            cause: cause.into(),
        }
    }

    pub fn is_empty_stream(&self) -> bool {
        matches!(self.cause, StageError::EmptyStream(_))
    }
}
