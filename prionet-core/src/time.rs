use anyhow::{Result, anyhow, bail, ensure};
use core::fmt;
use logos::{Lexer, Logos};
use std::{ops::Add, str::FromStr, time};

/// A point in simulated time.
///
/// Measured as the amount of simulated time elapsed since the
/// [`Scheduler`] was created, precise up to the micro second. Simulated
/// time only moves forward when the scheduler is advanced.
///
/// ```
/// # use prionet_core::time::Timestamp;
/// # use std::time::Duration;
/// let t = Timestamp::ZERO + Duration::from_millis(150);
/// assert_eq!(t.to_string(), "150ms");
/// assert_eq!(t.duration_since(Timestamp::ZERO), Duration::from_millis(150));
/// ```
///
/// [`Scheduler`]: crate::scheduler::Scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    /// create a timestamp `elapsed` after the start of the simulation
    ///
    /// nano seconds are truncated.
    #[inline(always)]
    pub const fn from_elapsed(elapsed: time::Duration) -> Self {
        Self(elapsed.as_micros() as u64)
    }

    /// simulated time elapsed since the start of the simulation
    #[inline(always)]
    pub fn elapsed(self) -> time::Duration {
        time::Duration::from_micros(self.0)
    }

    /// the duration between `earlier` and `self`
    ///
    /// Returns [`Duration::ZERO`](time::Duration::ZERO) if `earlier` is
    /// actually later than `self`.
    pub fn duration_since(self, earlier: Self) -> time::Duration {
        time::Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// move the timestamp back by `duration`, stopping at [`Timestamp::ZERO`]
    pub fn saturating_sub(self, duration: time::Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_micros() as u64))
    }
}

impl Add<time::Duration> for Timestamp {
    type Output = Self;
    fn add(self, rhs: time::Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs.as_micros() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Duration::new(self.elapsed()).fmt(f)
    }
}

/// Human readable [`std::time::Duration`].
///
/// Parses strings like `"100ms"`, `"1m 30s"` or `"24h"` and displays
/// them back in the same compact form.
///
/// ```
/// # use prionet_core::time::Duration;
/// let window: Duration = "6h".parse().unwrap();
/// assert_eq!(window.into_duration().as_secs(), 6 * 3_600);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(time::Duration);

impl Duration {
    pub fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Duration").field(&self.0).finish()
    }
}

impl From<Duration> for time::Duration {
    fn from(value: Duration) -> Self {
        value.into_duration()
    }
}

impl FromStr for Duration {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut durations = Vec::new();

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| anyhow!("Failed to parse: {s}"))?;

            ensure!(
                number == Token::Value,
                "Expecting duration to starts with number. Cannot parse {s}"
            );
            let number: u64 = lex.slice().parse()?;

            let Some(Ok(measure)) = lex.next() else {
                bail!("Expecting a measure, failed to parse: {s}")
            };
            let duration = match measure {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => time::Duration::from_secs(number * 60),
                Token::Hours => time::Duration::from_secs(number * 3_600),
                Token::Value => bail!("Failed to parse `{s}', expecting a measure."),
            };
            durations.push(duration);
        }

        ensure!(!durations.is_empty(), "Empty duration");

        Ok(Self(durations.into_iter().sum()))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|µs|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,
    #[token("h")]
    Hours,

    #[regex("[0-9]+")]
    Value,
}
