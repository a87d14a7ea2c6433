//! Scheduler statistics and observability types.
//!
//! [`SchedulerStats`] provides a point-in-time snapshot of the scheduler
//! state. Obtain one via [`Scheduler::stats`](crate::scheduler::Scheduler::stats).

use crate::{
    link::LinkState,
    packet::PacketId,
    priority::Priority,
    queue::QueueDepth,
    scheduler::Round,
    time::Timestamp,
};
use std::time::Duration;

/// Snapshot of a transmission occupying the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionStats {
    /// The packet being transmitted.
    pub id: PacketId,
    pub priority: Priority,
    /// When the current attempt started.
    pub started_at: Timestamp,
    /// How long the current attempt occupies the link.
    pub duration: Duration,
    /// Previous attempts, lost or preempted.
    pub retry_count: u32,
}

/// Point-in-time snapshot of the entire scheduler state.
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    /// Ticks run so far.
    pub round: Round,
    /// Current simulated time.
    pub now: Timestamp,
    /// Pending packets per priority.
    pub queue_depth: QueueDepth,
    /// Transmissions in flight, in the order they started.
    pub in_flight: Vec<TransmissionStats>,
    /// Transmitted packets waiting for their acknowledgment.
    pub awaiting_ack: usize,
    /// Packets currently kept in the history.
    pub history_len: usize,
    /// Snapshots currently kept in the archive.
    pub snapshots: usize,
    pub link: LinkState,
}
