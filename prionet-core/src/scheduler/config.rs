use crate::{
    defaults,
    link::{LossModel, UtilizationModel},
};
use std::time::Duration;
use thiserror::Error;

/// Where the analytics cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsMode {
    /// The scheduler aggregates the history itself at the end of the
    /// tick the cycle is due.
    #[default]
    Inline,
    /// The scheduler only prepares an [`AnalyticsJob`] and leaves the
    /// aggregation to the caller, see [`Scheduler::take_analytics_jobs`].
    ///
    /// [`AnalyticsJob`]: crate::analytics::AnalyticsJob
    /// [`Scheduler::take_analytics_jobs`]: crate::scheduler::Scheduler::take_analytics_jobs
    Offloaded,
}

/// Tuning of a [`Scheduler`].
///
/// ## Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | tick interval | 100ms |
/// | max in flight | 1 |
/// | transmission floor | 10ms |
/// | acknowledgment delay | 50ms..=150ms |
/// | utilization model | 5% idle, +40% per transmission, ±5% |
/// | loss model | 1% to 10% with the utilization |
/// | aggregation | every 10s over the last 60s |
/// | snapshot retention | 24h |
/// | history retention | 5m |
/// | watchdog | 60s |
/// | seed | 0 |
///
/// ```
/// use prionet_core::scheduler::SchedulerConfig;
/// use std::time::Duration;
///
/// let config = SchedulerConfig::default()
///     .set_max_in_flight(2)
///     .set_tick_interval(Duration::from_millis(50))
///     .set_seed(42);
/// assert!(config.validate().is_ok());
/// ```
///
/// [`Scheduler`]: crate::scheduler::Scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub max_in_flight: usize,
    pub transmission_floor: Duration,
    pub ack_delay_min: Duration,
    pub ack_delay_max: Duration,
    pub utilization: UtilizationModel,
    pub loss: LossModel,
    pub analytics: AnalyticsMode,
    pub aggregation_interval: Duration,
    pub aggregation_window: Duration,
    pub snapshot_retention: Duration,
    pub history_retention: Duration,
    pub watchdog: Duration,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Tick interval must be greater than zero")]
    ZeroTickInterval,
    #[error("At least one transmission must be allowed in flight (`max_in_flight')")]
    ZeroMaxInFlight,
    #[error("Empty acknowledgment delay range: {min:?} is greater than {max:?}")]
    AckDelayRange { min: Duration, max: Duration },
    #[error("Aggregation interval must be greater than zero")]
    ZeroAggregationInterval,
    #[error("Aggregation window must be greater than zero")]
    ZeroAggregationWindow,
    #[error("Invalid loss model: expecting 0 <= base ({base}) <= max ({max}) <= 1")]
    LossRange { base: f64, max: f64 },
    #[error("Invalid utilization model: loads must be positive percentages")]
    UtilizationRange,
    #[error("Link capacity must be greater than zero")]
    ZeroLinkCapacity,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: defaults::DEFAULT_TICK_INTERVAL,
            max_in_flight: defaults::DEFAULT_MAX_IN_FLIGHT,
            transmission_floor: defaults::DEFAULT_TRANSMISSION_FLOOR,
            ack_delay_min: defaults::DEFAULT_ACK_DELAY_MIN,
            ack_delay_max: defaults::DEFAULT_ACK_DELAY_MAX,
            utilization: UtilizationModel::default(),
            loss: LossModel::default(),
            analytics: AnalyticsMode::default(),
            aggregation_interval: defaults::DEFAULT_AGGREGATION_INTERVAL,
            aggregation_window: defaults::DEFAULT_AGGREGATION_WINDOW,
            snapshot_retention: defaults::DEFAULT_SNAPSHOT_RETENTION,
            history_retention: defaults::DEFAULT_HISTORY_RETENTION,
            watchdog: defaults::DEFAULT_WATCHDOG,
            seed: defaults::DEFAULT_SEED,
        }
    }
}

impl SchedulerConfig {
    /// Simulated time added by every call to [`Scheduler::tick`].
    ///
    /// [`Scheduler::tick`]: crate::scheduler::Scheduler::tick
    pub fn set_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn set_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn set_transmission_floor(mut self, floor: Duration) -> Self {
        self.transmission_floor = floor;
        self
    }

    /// The acknowledgment of a transmitted packet arrives after a uniform
    /// random delay in `[min, max]`.
    pub fn set_ack_delay(mut self, min: Duration, max: Duration) -> Self {
        self.ack_delay_min = min;
        self.ack_delay_max = max;
        self
    }

    pub fn set_utilization_model(mut self, model: UtilizationModel) -> Self {
        self.utilization = model;
        self
    }

    pub fn set_loss_model(mut self, model: LossModel) -> Self {
        self.loss = model;
        self
    }

    pub fn set_analytics_mode(mut self, mode: AnalyticsMode) -> Self {
        self.analytics = mode;
        self
    }

    /// Run the analytics every `interval` over the trailing `window`.
    pub fn set_aggregation(mut self, interval: Duration, window: Duration) -> Self {
        self.aggregation_interval = interval;
        self.aggregation_window = window;
        self
    }

    pub fn set_snapshot_retention(mut self, retention: Duration) -> Self {
        self.snapshot_retention = retention;
        self
    }

    /// Keep the records of finished packets for `retention`, or for the
    /// aggregation window if that is longer.
    pub fn set_history_retention(mut self, retention: Duration) -> Self {
        self.history_retention = retention;
        self
    }

    /// Warn once about any packet in flight for longer than `watchdog`.
    pub fn set_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroMaxInFlight);
        }
        if self.ack_delay_min > self.ack_delay_max {
            return Err(ConfigError::AckDelayRange {
                min: self.ack_delay_min,
                max: self.ack_delay_max,
            });
        }
        if self.aggregation_interval.is_zero() {
            return Err(ConfigError::ZeroAggregationInterval);
        }
        if self.aggregation_window.is_zero() {
            return Err(ConfigError::ZeroAggregationWindow);
        }
        if let LossModel::Utilization { base, max } = self.loss
            && !(0.0 <= base && base <= max && max <= 1.0)
        {
            return Err(ConfigError::LossRange { base, max });
        }
        let UtilizationModel {
            idle_load,
            per_transmission_load,
            jitter,
        } = self.utilization;
        if !(idle_load >= 0.0 && per_transmission_load >= 0.0 && jitter >= 0.0) {
            return Err(ConfigError::UtilizationRange);
        }

        Ok(())
    }
}
