use crate::measure::Bandwidth;
use std::time::Duration;

/// Default interval between two ticks of the [`Scheduler`].
///
/// ```
/// # use prionet_core::defaults::*;
/// assert_eq!(DEFAULT_TICK_INTERVAL.as_millis(), 100);
/// ```
///
/// [`Scheduler`]: crate::scheduler::Scheduler
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of packets that may be transmitting at the same time.
///
/// The shared channel carries one transmission at a time unless
/// configured otherwise.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1;

/// Minimum duration of any transmission.
///
/// Prevents degenerate zero-duration transmissions for empty or tiny
/// payloads on fast links.
pub const DEFAULT_TRANSMISSION_FLOOR: Duration = Duration::from_millis(10);

/// Lower bound of the simulated acknowledgment delay.
pub const DEFAULT_ACK_DELAY_MIN: Duration = Duration::from_millis(50);

/// Upper bound of the simulated acknowledgment delay.
pub const DEFAULT_ACK_DELAY_MAX: Duration = Duration::from_millis(150);

/// Default capacity of a simulated link.
///
/// ```
/// # use prionet_core::defaults::*;
/// assert_eq!(
///     DEFAULT_LINK_CAPACITY.to_string(),
///     "1mbps"
/// );
/// ```
pub const DEFAULT_LINK_CAPACITY: Bandwidth = Bandwidth::from_kbps(1_000);

/// Default jitter of a simulated link.
pub const DEFAULT_LINK_JITTER: Duration = Duration::from_millis(5);

/// Utilization of an idle link, in percent.
pub const DEFAULT_IDLE_LOAD: f64 = 5.0;

/// Utilization added by each transmission in flight, in percent.
pub const DEFAULT_PER_TRANSMISSION_LOAD: f64 = 40.0;

/// Amplitude of the random utilization jitter, in percentage points.
pub const DEFAULT_UTILIZATION_JITTER: f64 = 5.0;

/// Loss probability of an idle link.
pub const DEFAULT_BASE_LOSS: f64 = 0.01;

/// Loss probability of a fully utilized link. The derived loss rate
/// never goes above this value.
pub const DEFAULT_MAX_LOSS: f64 = 0.10;

/// Default interval between two analytics aggregation cycles.
pub const DEFAULT_AGGREGATION_INTERVAL: Duration = Duration::from_secs(10);

/// Default trailing window scanned by an aggregation cycle.
pub const DEFAULT_AGGREGATION_WINDOW: Duration = Duration::from_secs(60);

/// How long analytics snapshots are kept around for lookback queries.
///
/// ```
/// # use prionet_core::defaults::*;
/// assert_eq!(DEFAULT_SNAPSHOT_RETENTION.as_secs(), 24 * 3_600);
/// ```
pub const DEFAULT_SNAPSHOT_RETENTION: Duration = Duration::from_secs(24 * 3_600);

/// How long the records of finished packets stay in the history.
///
/// The analytics never look further back than the aggregation window,
/// the history keeps at least that much regardless of this setting.
pub const DEFAULT_HISTORY_RETENTION: Duration = Duration::from_secs(5 * 60);

/// A packet transmitting for longer than this is reported as stuck.
pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(60);

/// Seed of the scheduler's random number generator.
pub const DEFAULT_SEED: u64 = 0;
