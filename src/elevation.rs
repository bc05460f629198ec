//! Elevation gain/loss strategies.
//!
//! Both strategies walk the elevation sub-series pairwise in stream order.
//! A series with fewer than two points has no delta to measure, so the
//! result is `Undetermined` rather than zero.

use crate::error::{ConfigError, ElevationError};

/// Result of an elevation calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElevationOutcome {
    /// No elevation data, or a single point.
    Undetermined,
    Measured { gain: f64, loss: f64 },
}

impl ElevationOutcome {
    pub fn gain(&self) -> Option<f64> {
        match self {
            ElevationOutcome::Measured { gain, .. } => Some(*gain),
            ElevationOutcome::Undetermined => None,
        }
    }

    pub fn loss(&self) -> Option<f64> {
        match self {
            ElevationOutcome::Measured { loss, .. } => Some(*loss),
            ElevationOutcome::Undetermined => None,
        }
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self, ElevationOutcome::Undetermined)
    }
}

/// Sums every rise as gain and every drop as loss.
///
/// Every micro-fluctuation counts, so this overestimates on noisy or flat
/// terrain. That bias is part of the method.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeElevationStrategy;

impl CumulativeElevationStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate<I>(&self, series: I) -> Result<ElevationOutcome, ElevationError>
    where
        I: IntoIterator<Item = f64>,
    {
        accumulate(series, 0.0)
    }
}

/// Counts a step only when its magnitude exceeds the threshold.
///
/// The filter is memoryless: a step of magnitude `<= threshold` is dropped
/// and never carried into the next one. A slow climb made of many small
/// steps is invisible even if it adds up to more than the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdElevationStrategy {
    threshold: f64,
}

impl ThresholdElevationStrategy {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold);
        }
        if threshold < 0.0 {
            return Err(ConfigError::NegativeThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn calculate<I>(&self, series: I) -> Result<ElevationOutcome, ElevationError>
    where
        I: IntoIterator<Item = f64>,
    {
        accumulate(series, self.threshold)
    }
}

/// The closed set of strategies an activity can be built with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElevationStrategy {
    Cumulative(CumulativeElevationStrategy),
    Threshold(ThresholdElevationStrategy),
}

impl Default for ElevationStrategy {
    fn default() -> Self {
        ElevationStrategy::Cumulative(CumulativeElevationStrategy)
    }
}

impl From<CumulativeElevationStrategy> for ElevationStrategy {
    fn from(strategy: CumulativeElevationStrategy) -> Self {
        ElevationStrategy::Cumulative(strategy)
    }
}

impl From<ThresholdElevationStrategy> for ElevationStrategy {
    fn from(strategy: ThresholdElevationStrategy) -> Self {
        ElevationStrategy::Threshold(strategy)
    }
}

impl ElevationStrategy {
    pub fn cumulative() -> Self {
        Self::default()
    }

    pub fn threshold(threshold: f64) -> Result<Self, ConfigError> {
        ThresholdElevationStrategy::new(threshold).map(Self::from)
    }

    pub fn calculate<I>(&self, series: I) -> Result<ElevationOutcome, ElevationError>
    where
        I: IntoIterator<Item = f64>,
    {
        match self {
            ElevationStrategy::Cumulative(strategy) => strategy.calculate(series),
            ElevationStrategy::Threshold(strategy) => strategy.calculate(series),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ElevationStrategy::Cumulative(_) => "cumulative".to_string(),
            ElevationStrategy::Threshold(strategy) => format!("threshold({:.2}m)", strategy.threshold),
        }
    }
}

// With threshold 0.0 this is exactly the cumulative walk: any positive delta
// is gain, any negative delta is loss, equal values add nothing.
fn accumulate<I>(series: I, threshold: f64) -> Result<ElevationOutcome, ElevationError>
where
    I: IntoIterator<Item = f64>,
{
    let mut values = series.into_iter().enumerate();

    let mut previous = match values.next() {
        Some((index, ele)) => finite(index, ele)?,
        None => return Ok(ElevationOutcome::Undetermined),
    };

    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut pairs = 0usize;

    for (index, ele) in values {
        let current = finite(index, ele)?;
        let delta = current - previous;

        if delta > threshold {
            gain += delta;
        } else if -delta > threshold {
            loss += -delta;
        }

        previous = current;
        pairs += 1;
    }

    if pairs == 0 {
        return Ok(ElevationOutcome::Undetermined);
    }

    Ok(ElevationOutcome::Measured {
        gain: f64::max(gain, 0.0),
        loss: f64::max(loss, 0.0),
    })
}

fn finite(index: usize, value: f64) -> Result<f64, ElevationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ElevationError::NonFiniteValue { index })
    }
}
