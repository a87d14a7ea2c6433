mod id;

use crate::{
    defaults,
    measure::{Bandwidth, PacketLoss, sample},
    scheduler::ConfigError,
    time::Timestamp,
};
use rand_core::Rng;
use std::time::Duration;

pub use self::id::LinkId;

/// Highest utilization taken into account when computing a transmission
/// duration, so the effective capacity never reaches zero.
const MAX_EFFECTIVE_UTILIZATION: f64 = 99.0;

/// Opaque location metadata of the two ends of a link.
///
/// The scheduler carries it around for the dashboards, it never
/// interprets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkEndpoints {
    pub a: Option<String>,
    pub b: Option<String>,
}

/// Static description of a link, as configured.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    pub id: LinkId,
    pub capacity: Bandwidth,
    pub jitter: Duration,
    pub active: bool,
    pub endpoints: LinkEndpoints,
}

/// How the link utilization reacts to the number of transmissions in flight.
///
/// `utilization = clamp(0, 100, idle_load + n * per_transmission_load ± jitter)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationModel {
    /// utilization of the idle link, in percent
    pub idle_load: f64,
    /// utilization added by every transmission in flight, in percent
    pub per_transmission_load: f64,
    /// amplitude of the uniform random jitter, in percentage points
    pub jitter: f64,
}

/// Where the loss probability of a transmission attempt comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossModel {
    /// Derived from the link utilization:
    /// `min(max, base + (max - base) * utilization / 100)`.
    Utilization { base: f64, max: f64 },
    /// The same loss model regardless of the utilization.
    Fixed(PacketLoss),
}

/// Point-in-time view of a [`Link`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    pub id: LinkId,
    pub capacity: Bandwidth,
    /// current utilization, in percent (`0.0..=100.0`)
    pub utilization: f64,
    pub packet_loss: PacketLoss,
    pub jitter: Duration,
    pub active: bool,
    pub endpoints: LinkEndpoints,
    /// when the utilization and loss were last recomputed
    pub updated_at: Timestamp,
}

/// The simulated shared channel.
///
/// Its capacity, jitter and endpoints are fixed by the [`LinkConfig`].
/// Its utilization and loss rate are recomputed by the scheduler, and
/// only by the scheduler, every time a transmission resolves.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    capacity: Bandwidth,
    jitter: Duration,
    active: bool,
    endpoints: LinkEndpoints,

    utilization: f64,
    packet_loss: PacketLoss,
    updated_at: Timestamp,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            id: LinkId::ZERO,
            capacity: defaults::DEFAULT_LINK_CAPACITY,
            jitter: defaults::DEFAULT_LINK_JITTER,
            active: true,
            endpoints: LinkEndpoints::default(),
        }
    }
}

impl Default for UtilizationModel {
    fn default() -> Self {
        Self {
            idle_load: defaults::DEFAULT_IDLE_LOAD,
            per_transmission_load: defaults::DEFAULT_PER_TRANSMISSION_LOAD,
            jitter: defaults::DEFAULT_UTILIZATION_JITTER,
        }
    }
}

impl LinkConfig {
    /// A link without capacity would hold its first transmission forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity.bits_per_sec() == 0 {
            return Err(ConfigError::ZeroLinkCapacity);
        }
        Ok(())
    }
}

impl UtilizationModel {
    /// utilization before jitter for `active_count` transmissions in flight
    pub fn base_load(&self, active_count: usize) -> f64 {
        self.idle_load + active_count as f64 * self.per_transmission_load
    }
}

impl Default for LossModel {
    fn default() -> Self {
        Self::Utilization {
            base: defaults::DEFAULT_BASE_LOSS,
            max: defaults::DEFAULT_MAX_LOSS,
        }
    }
}

impl LossModel {
    /// The loss model of a link running at `utilization` percent.
    ///
    /// Monotonically non-decreasing in `utilization` and never above
    /// `max` for the [`LossModel::Utilization`] model.
    ///
    /// ```
    /// # use prionet_core::link::LossModel;
    /// let model = LossModel::Utilization { base: 0.01, max: 0.10 };
    /// assert_eq!(model.loss_for(0.0).probability(), 0.01);
    /// assert_eq!(model.loss_for(100.0).probability(), 0.10);
    /// ```
    pub fn loss_for(&self, utilization: f64) -> PacketLoss {
        match *self {
            Self::Fixed(loss) => loss,
            Self::Utilization { base, max } => {
                let load = utilization.clamp(0.0, 100.0) / 100.0;
                let rate = base * (1.0 - load) + max * load;
                PacketLoss::saturating(rate.min(max))
            }
        }
    }
}

impl Link {
    /// Create a link from its configuration, at rest.
    pub fn new(config: LinkConfig, utilization: &UtilizationModel, loss: &LossModel) -> Self {
        let LinkConfig {
            id,
            capacity,
            jitter,
            active,
            endpoints,
        } = config;
        let idle = utilization.base_load(0).clamp(0.0, 100.0);

        Self {
            id,
            capacity,
            jitter,
            active,
            endpoints,
            utilization: idle,
            packet_loss: loss.loss_for(idle),
            updated_at: Timestamp::ZERO,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn capacity(&self) -> Bandwidth {
        self.capacity
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    pub fn packet_loss(&self) -> PacketLoss {
        self.packet_loss
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// How long `bytes_size` bytes occupy the link at its current
    /// utilization, never shorter than `floor`.
    ///
    /// `size_bits / (capacity * (1 - utilization / 100))`
    pub fn transmission_duration(&self, bytes_size: u64, floor: Duration) -> Duration {
        let utilization = self.utilization.clamp(0.0, MAX_EFFECTIVE_UTILIZATION);
        let share = 1.0 - utilization / 100.0;

        self.capacity.transfer_time_at(bytes_size, share).max(floor)
    }

    /// Returns `true` if the transmission attempt is lost.
    ///
    /// The caller provides `rng` so that all simulation randomness is
    /// controlled from the scheduler's single, seedable source.
    pub fn should_drop_packet<R: Rng>(&self, rng: &mut R) -> bool {
        self.packet_loss.should_drop(rng)
    }

    /// Recompute the utilization and the loss rate for `active_count`
    /// transmissions in flight.
    pub(crate) fn update_utilization<R: Rng>(
        &mut self,
        active_count: usize,
        model: &UtilizationModel,
        loss: &LossModel,
        now: Timestamp,
        rng: &mut R,
    ) {
        let jitter = sample::symmetric(rng, model.jitter);
        self.utilization = (model.base_load(active_count) + jitter).clamp(0.0, 100.0);
        self.packet_loss = loss.loss_for(self.utilization);
        self.updated_at = now;
    }

    pub fn state(&self) -> LinkState {
        LinkState {
            id: self.id,
            capacity: self.capacity,
            utilization: self.utilization,
            packet_loss: self.packet_loss,
            jitter: self.jitter,
            active: self.active,
            endpoints: self.endpoints.clone(),
            updated_at: self.updated_at,
        }
    }
}
