use super::sample;
use rand_core::Rng;
use std::{fmt, str::FromStr};

/// Probabilistic loss model for a transmission attempt.
///
/// Either derived from the link utilization by the scheduler or
/// configured once as a fixed model (see [`LossModel`]).
///
/// # Example
///
/// ```
/// use prionet_core::measure::PacketLoss;
///
/// // No packet loss
/// let none = PacketLoss::None;
///
/// // 5% packet loss (programmatic)
/// let lossy = PacketLoss::rate(0.05).unwrap();
/// assert_eq!(lossy.to_string(), "5%");
///
/// // 5% packet loss (parsed)
/// let parsed: PacketLoss = "5%".parse().unwrap();
/// assert_eq!(parsed, lossy);
/// ```
///
/// [`LossModel`]: crate::link::LossModel
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum PacketLoss {
    /// Every attempt goes through (default).
    #[default]
    None,
    /// Random loss at the given rate (`0.0..=1.0`).
    ///
    /// Use [`PacketLoss::rate`] to construct this variant, it validates
    /// the value at creation time.
    Rate(PacketLossRate),
}

/// A validated packet loss rate in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketLossRate(f64);

impl PacketLoss {
    /// Create a `PacketLoss::Rate` with a validated loss probability.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is not in `[0.0, 1.0]` (including NaN).
    pub fn rate(rate: f64) -> Result<Self, PacketLossRateError> {
        Ok(PacketLoss::Rate(PacketLossRate::new(rate)?))
    }

    /// Build the loss model for a computed probability.
    ///
    /// The probability is clamped into `[0.0, 1.0]`; NaN means no loss.
    pub(crate) fn saturating(probability: f64) -> Self {
        if probability.is_nan() || probability <= 0.0 {
            PacketLoss::None
        } else {
            PacketLoss::Rate(PacketLossRate(probability.min(1.0)))
        }
    }

    /// The probability for an attempt to be lost.
    pub fn probability(&self) -> f64 {
        match self {
            PacketLoss::None => 0.0,
            PacketLoss::Rate(rate) => rate.0,
        }
    }

    /// Returns `true` if this attempt is lost.
    ///
    /// The caller provides `rng` so that all simulation randomness is
    /// controlled from a single, seedable source in the [`Scheduler`].
    ///
    /// [`Scheduler`]: crate::scheduler::Scheduler
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        match self {
            PacketLoss::None => false,
            PacketLoss::Rate(rate) => sample::unit(rng) < rate.0,
        }
    }
}

impl fmt::Display for PacketLoss {
    /// Formats as a percentage with up to 2 decimal places.
    ///
    /// - `PacketLoss::None` → `"0%"`
    /// - `PacketLoss::Rate(0.05)` → `"5%"`
    /// - `PacketLoss::Rate(0.123)` → `"12.30%"`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketLoss::None => write!(f, "0%"),
            PacketLoss::Rate(rate) => write!(f, "{rate}"),
        }
    }
}

impl FromStr for PacketLoss {
    type Err = PacketLossParseError;

    /// Parses a percentage string like `"0%"`, `"5%"`, `"12.30%"`, `"100%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(num) = s.strip_suffix('%') else {
            return Err(PacketLossParseError::MissingSuffix);
        };
        let pct: f64 = num
            .trim()
            .parse()
            .map_err(|_| PacketLossParseError::InvalidNumber)?;
        let rate = pct / 100.0;
        if rate == 0.0 {
            return Ok(PacketLoss::None);
        }
        PacketLoss::rate(rate).map_err(PacketLossParseError::OutOfRange)
    }
}

impl fmt::Display for PacketLossRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        if pct.fract() == 0.0 {
            write!(f, "{}%", pct as u64)
        } else {
            write!(f, "{:.2}%", pct)
        }
    }
}

impl PacketLossRate {
    /// # Errors
    ///
    /// Returns [`PacketLossRateError`] if `rate` is NaN, negative, or
    /// greater than `1.0`.
    pub fn new(rate: f64) -> Result<Self, PacketLossRateError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PacketLossRateError(rate));
        }
        Ok(Self(rate))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Error returned when constructing a [`PacketLossRate`] with a value
/// outside `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("packet loss rate must be in [0.0, 1.0], got {0}")]
pub struct PacketLossRateError(f64);

/// Error returned when parsing a [`PacketLoss`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PacketLossParseError {
    #[error("expected '%' suffix")]
    MissingSuffix,
    #[error("invalid number before '%'")]
    InvalidNumber,
    #[error("{0}")]
    OutOfRange(#[from] PacketLossRateError),
}
