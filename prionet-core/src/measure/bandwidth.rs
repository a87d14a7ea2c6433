use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};

/// Capacity of a simulated channel, in bits per second.
///
/// Units are decimal: `1kbps` is `1_000` bits per second, the way radio
/// links are usually rated.
///
/// # Example
///
/// ```
/// # use prionet_core::measure::Bandwidth;
/// # use std::time::Duration;
/// let bw: Bandwidth = "512kbps".parse().unwrap();
/// assert_eq!(bw.bits_per_sec(), 512_000);
/// assert_eq!(bw.kbps(), 512.0);
///
/// // 64_000 bytes over a 512kbps channel take one second.
/// assert_eq!(bw.transfer_time(64_000), Duration::from_secs(1));
/// ```
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth(u64);

const K: u64 = 1_000;
const M: u64 = 1_000 * K;
const G: u64 = 1_000 * M;

impl Bandwidth {
    /// create a new [`Bandwidth`] of `bits_per_sec` bits per second
    pub const fn new(bits_per_sec: u64) -> Self {
        Self(bits_per_sec)
    }

    /// create a new [`Bandwidth`] of `kbps` kilo bits per second
    pub const fn from_kbps(kbps: u64) -> Self {
        Self(kbps.saturating_mul(K))
    }

    #[inline]
    pub fn bits_per_sec(&self) -> u64 {
        self.0
    }

    /// The capacity in kilo bits per second.
    #[inline]
    pub fn kbps(&self) -> f64 {
        self.0 as f64 / K as f64
    }

    /// Time it takes to push `bytes` through the whole capacity.
    ///
    /// A zero bandwidth never completes a transfer and returns
    /// [`Duration::MAX`].
    pub fn transfer_time(&self, bytes: u64) -> Duration {
        self.transfer_time_at(bytes, 1.0)
    }

    /// Time it takes to push `bytes` when only `share` (`0.0..=1.0`) of
    /// the capacity is available.
    pub fn transfer_time_at(&self, bytes: u64, share: f64) -> Duration {
        let effective = self.0 as f64 * share.clamp(0.0, 1.0);
        if effective <= 0.0 {
            return Duration::MAX;
        }
        let bits = bytes.saturating_mul(8) as f64;
        let nanos = (bits * 1e9 / effective).round();
        if nanos >= u64::MAX as f64 {
            return Duration::MAX;
        }
        Duration::from_nanos(nanos as u64)
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = self.0;

        if v < K || v % K != 0 {
            write!(f, "{v}bps")
        } else if v < M || v % M != 0 {
            write!(f, "{}kbps", v / K)
        } else if v < G || v % G != 0 {
            write!(f, "{}mbps", v / M)
        } else {
            write!(f, "{}gbps", v / G)
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum BandwidthToken {
    #[regex("bps")]
    Bps,
    #[regex("kbps")]
    Kbps,
    #[regex("mbps")]
    Mbps,
    #[regex("gbps")]
    Gbps,

    #[regex("[0-9]+")]
    Value,
}

impl FromStr for Bandwidth {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, BandwidthToken>::new(s);

        let Some(Ok(BandwidthToken::Value)) = lex.next() else {
            bail!("Expecting to parse a number")
        };
        let number: u64 = lex.slice().parse()?;
        let Some(Ok(token)) = lex.next() else {
            bail!("Expecting to parse a unit")
        };
        let bps = match token {
            BandwidthToken::Bps => number,
            BandwidthToken::Kbps => number.saturating_mul(K),
            BandwidthToken::Mbps => number.saturating_mul(M),
            BandwidthToken::Gbps => number.saturating_mul(G),
            BandwidthToken::Value => bail!("Expecting to parse a unit (bps, kbps, ...)"),
        };

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a bandwidth"
        );

        Ok(Self::new(bps))
    }
}

impl Default for Bandwidth {
    fn default() -> Self {
        crate::defaults::DEFAULT_LINK_CAPACITY
    }
}
