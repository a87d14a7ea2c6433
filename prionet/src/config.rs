//! TOML configuration of a [`SchedulerContext`].
//!
//! Every setting is optional and falls back on the defaults of
//! [`prionet_core::defaults`]. Durations and bandwidths are written the
//! way they are displayed (`"100ms"`, `"24h"`, `"512kbps"`).
//!
//! ```toml
//! [scheduler]
//! tick_interval = "100ms"
//! max_in_flight = 1
//! transmission_floor = "10ms"
//! ack_delay_min = "50ms"
//! ack_delay_max = "150ms"
//! watchdog = "60s"
//! seed = 42
//!
//! [scheduler.utilization]
//! idle_load = 5.0
//! per_transmission_load = 40.0
//! jitter = 5.0
//!
//! [scheduler.loss]
//! base = 0.01
//! max = 0.10
//! # or a fixed loss rate, regardless of the utilization:
//! # fixed = "2%"
//!
//! [analytics]
//! interval = "10s"
//! window = "60s"
//! retention = "24h"
//! history_retention = "5m"
//!
//! [link]
//! id = 1
//! capacity = "1mbps"
//! jitter = "5ms"
//! active = true
//! endpoint_a = "ambulance-12"
//! endpoint_b = "tower-north"
//!
//! [runtime]
//! command_capacity = 1024
//! ```
//!
//! [`SchedulerContext`]: crate::SchedulerContext

use prionet_core::{
    defaults,
    link::{LinkConfig, LinkEndpoints, LinkId, LossModel, UtilizationModel},
    measure::{Bandwidth, PacketLoss},
    scheduler::SchedulerConfig,
};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Default capacity of the command channel between the handles and the
/// scheduler thread.
pub const DEFAULT_COMMAND_CAPACITY: usize = 1_024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file `{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for `{field}': {error:#}")]
    InvalidValue {
        field: &'static str,
        error: anyhow::Error,
    },
    #[error("The command channel needs room for at least one command")]
    ZeroCommandCapacity,
    #[error(transparent)]
    Scheduler(#[from] prionet_core::scheduler::ConfigError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigInput {
    pub scheduler: SchedulerInput,
    pub analytics: AnalyticsInput,
    pub link: LinkInput,
    pub runtime: RuntimeInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerInput {
    pub tick_interval: Option<String>,
    pub max_in_flight: Option<usize>,
    pub transmission_floor: Option<String>,
    pub ack_delay_min: Option<String>,
    pub ack_delay_max: Option<String>,
    pub watchdog: Option<String>,
    pub seed: Option<u64>,
    pub utilization: UtilizationInput,
    pub loss: LossInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UtilizationInput {
    pub idle_load: Option<f64>,
    pub per_transmission_load: Option<f64>,
    pub jitter: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LossInput {
    pub base: Option<f64>,
    pub max: Option<f64>,
    /// takes precedence over `base` and `max`
    pub fixed: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsInput {
    pub interval: Option<String>,
    pub window: Option<String>,
    pub retention: Option<String>,
    pub history_retention: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkInput {
    pub id: Option<u64>,
    pub capacity: Option<String>,
    pub jitter: Option<String>,
    pub active: Option<bool>,
    pub endpoint_a: Option<String>,
    pub endpoint_b: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeInput {
    pub command_capacity: Option<usize>,
}

/// Everything needed to start a [`SchedulerContext`](crate::SchedulerContext).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub link: LinkConfig,
    /// how many commands may wait for the scheduler thread before the
    /// handles get [`SubmitError::Full`](crate::SubmitError::Full)
    pub command_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            link: LinkConfig::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

fn duration(
    field: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    value
        .parse::<prionet_core::time::Duration>()
        .map(|duration| duration.into_duration())
        .map_err(|error| ConfigError::InvalidValue { field, error })
}

fn bandwidth(
    field: &'static str,
    value: Option<String>,
    default: Bandwidth,
) -> Result<Bandwidth, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    value
        .parse::<Bandwidth>()
        .map_err(|error| ConfigError::InvalidValue { field, error })
}

/// trimmed, `None` if blank
fn endpoint(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

impl ConfigInput {
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let Self {
            scheduler,
            analytics,
            link,
            runtime,
        } = self;

        let utilization = UtilizationModel {
            idle_load: scheduler
                .utilization
                .idle_load
                .unwrap_or(defaults::DEFAULT_IDLE_LOAD),
            per_transmission_load: scheduler
                .utilization
                .per_transmission_load
                .unwrap_or(defaults::DEFAULT_PER_TRANSMISSION_LOAD),
            jitter: scheduler
                .utilization
                .jitter
                .unwrap_or(defaults::DEFAULT_UTILIZATION_JITTER),
        };

        let loss = match scheduler.loss.fixed {
            Some(fixed) => {
                let loss = fixed
                    .parse::<PacketLoss>()
                    .map_err(|error| ConfigError::InvalidValue {
                        field: "scheduler.loss.fixed",
                        error: error.into(),
                    })?;
                LossModel::Fixed(loss)
            }
            None => LossModel::Utilization {
                base: scheduler.loss.base.unwrap_or(defaults::DEFAULT_BASE_LOSS),
                max: scheduler.loss.max.unwrap_or(defaults::DEFAULT_MAX_LOSS),
            },
        };

        let scheduler = SchedulerConfig::default()
            .set_tick_interval(duration(
                "scheduler.tick_interval",
                scheduler.tick_interval,
                defaults::DEFAULT_TICK_INTERVAL,
            )?)
            .set_max_in_flight(
                scheduler
                    .max_in_flight
                    .unwrap_or(defaults::DEFAULT_MAX_IN_FLIGHT),
            )
            .set_transmission_floor(duration(
                "scheduler.transmission_floor",
                scheduler.transmission_floor,
                defaults::DEFAULT_TRANSMISSION_FLOOR,
            )?)
            .set_ack_delay(
                duration(
                    "scheduler.ack_delay_min",
                    scheduler.ack_delay_min,
                    defaults::DEFAULT_ACK_DELAY_MIN,
                )?,
                duration(
                    "scheduler.ack_delay_max",
                    scheduler.ack_delay_max,
                    defaults::DEFAULT_ACK_DELAY_MAX,
                )?,
            )
            .set_watchdog(duration(
                "scheduler.watchdog",
                scheduler.watchdog,
                defaults::DEFAULT_WATCHDOG,
            )?)
            .set_seed(scheduler.seed.unwrap_or(defaults::DEFAULT_SEED))
            .set_utilization_model(utilization)
            .set_loss_model(loss)
            .set_aggregation(
                duration(
                    "analytics.interval",
                    analytics.interval,
                    defaults::DEFAULT_AGGREGATION_INTERVAL,
                )?,
                duration(
                    "analytics.window",
                    analytics.window,
                    defaults::DEFAULT_AGGREGATION_WINDOW,
                )?,
            )
            .set_snapshot_retention(duration(
                "analytics.retention",
                analytics.retention,
                defaults::DEFAULT_SNAPSHOT_RETENTION,
            )?)
            .set_history_retention(duration(
                "analytics.history_retention",
                analytics.history_retention,
                defaults::DEFAULT_HISTORY_RETENTION,
            )?);
        scheduler.validate()?;

        let link = LinkConfig {
            id: link.id.map(LinkId::new).unwrap_or(LinkId::ZERO),
            capacity: bandwidth(
                "link.capacity",
                link.capacity,
                defaults::DEFAULT_LINK_CAPACITY,
            )?,
            jitter: duration("link.jitter", link.jitter, defaults::DEFAULT_LINK_JITTER)?,
            active: link.active.unwrap_or(true),
            endpoints: LinkEndpoints {
                a: endpoint(link.endpoint_a),
                b: endpoint(link.endpoint_b),
            },
        };
        link.validate()?;

        let command_capacity = runtime.command_capacity.unwrap_or(DEFAULT_COMMAND_CAPACITY);
        if command_capacity == 0 {
            return Err(ConfigError::ZeroCommandCapacity);
        }

        Ok(Config {
            scheduler,
            link,
            command_capacity,
        })
    }
}

impl Config {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Config::default());
        }
        let parsed: ConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
        assert_eq!(Config::from_toml_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn parse_toml_config() {
        let toml = r#"
            [scheduler]
            tick_interval = "50ms"
            max_in_flight = 2
            ack_delay_min = "20ms"
            ack_delay_max = "40ms"
            seed = 42

            [scheduler.utilization]
            per_transmission_load = 30.0

            [scheduler.loss]
            base = 0.0
            max = 0.2

            [analytics]
            interval = "1m"
            window = "5m"
            retention = "6h"
            history_retention = "2m"

            [link]
            id = 3
            capacity = "512kbps"
            jitter = "2ms"
            endpoint_a = "ambulance-12"
            endpoint_b = "  "

            [runtime]
            command_capacity = 16
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        let scheduler = &config.scheduler;
        assert_eq!(scheduler.tick_interval, Duration::from_millis(50));
        assert_eq!(scheduler.max_in_flight, 2);
        assert_eq!(scheduler.ack_delay_min, Duration::from_millis(20));
        assert_eq!(scheduler.ack_delay_max, Duration::from_millis(40));
        assert_eq!(scheduler.seed, 42);
        assert_eq!(scheduler.utilization.per_transmission_load, 30.0);
        assert_eq!(scheduler.utilization.idle_load, defaults::DEFAULT_IDLE_LOAD);
        assert_eq!(scheduler.loss, LossModel::Utilization { base: 0.0, max: 0.2 });
        assert_eq!(scheduler.aggregation_interval, Duration::from_secs(60));
        assert_eq!(scheduler.aggregation_window, Duration::from_secs(300));
        assert_eq!(scheduler.snapshot_retention, Duration::from_secs(6 * 3_600));
        assert_eq!(scheduler.history_retention, Duration::from_secs(120));
        assert_eq!(scheduler.transmission_floor, defaults::DEFAULT_TRANSMISSION_FLOOR);

        assert_eq!(config.link.id, LinkId::new(3));
        assert_eq!(config.link.capacity.bits_per_sec(), 512_000);
        assert_eq!(config.link.jitter, Duration::from_millis(2));
        assert!(config.link.active);
        assert_eq!(config.link.endpoints.a.as_deref(), Some("ambulance-12"));
        assert_eq!(config.link.endpoints.b, None);

        assert_eq!(config.command_capacity, 16);
    }

    #[test]
    fn fixed_loss() {
        let config = Config::from_toml_str(
            r#"
            [scheduler.loss]
            fixed = "25%"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.scheduler.loss,
            LossModel::Fixed(PacketLoss::rate(0.25).unwrap())
        );
    }

    #[test]
    fn invalid_duration() {
        let error = Config::from_toml_str(
            r#"
            [scheduler]
            tick_interval = "soon"
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                field: "scheduler.tick_interval",
                ..
            }
        ));
    }

    #[test]
    fn invalid_bandwidth() {
        let error = Config::from_toml_str(
            r#"
            [link]
            capacity = "fast"
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                field: "link.capacity",
                ..
            }
        ));
    }

    #[test]
    fn zero_link_capacity() {
        let error = Config::from_toml_str(
            r#"
            [link]
            capacity = "0bps"
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::Scheduler(prionet_core::scheduler::ConfigError::ZeroLinkCapacity)
        ));
    }

    #[test]
    fn invalid_toml() {
        let error = Config::from_toml_str("[scheduler").unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)));

        let error = Config::from_toml_str("[scheduler]\nmax_in_flight = \"two\"").unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)));
    }

    #[test]
    fn invalid_ranges() {
        let error = Config::from_toml_str(
            r#"
            [scheduler]
            ack_delay_min = "200ms"
            ack_delay_max = "100ms"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Scheduler(prionet_core::scheduler::ConfigError::AckDelayRange { .. })
        ));

        let error = Config::from_toml_str("[scheduler]\nmax_in_flight = 0").unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Scheduler(prionet_core::scheduler::ConfigError::ZeroMaxInFlight)
        ));

        let error = Config::from_toml_str("[scheduler]\ntick_interval = \"0ms\"").unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Scheduler(prionet_core::scheduler::ConfigError::ZeroTickInterval)
        ));

        let error = Config::from_toml_str("[runtime]\ncommand_capacity = 0").unwrap_err();
        assert!(matches!(error, ConfigError::ZeroCommandCapacity));
    }

    #[test]
    fn missing_file() {
        let error = Config::from_path("/nonexistent/prionet.toml").unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }
}
