//! Per-priority delivery statistics.
//!
//! Every aggregation interval the [`Aggregator`] summarizes the packets
//! that arrived within the trailing window into one
//! [`AnalyticsSnapshot`] per [`Priority`]. The snapshots are kept in a
//! [`SnapshotArchive`] that answers lookback queries (`"1h"`, `"6h"`,
//! `"24h"`) for the dashboards.
//!
//! Only packets that reached a resolution are counted: `Transmitted`,
//! `Acknowledged` or `Dropped`. A packet still queued, in flight or
//! waiting for a retry is pending and is left out until it resolves.

use crate::{
    packet::{PacketRecord, PacketStatus},
    priority::Priority,
    time::Timestamp,
};
use std::{collections::VecDeque, time::Duration};

/// Delivery statistics of one priority level over one window.
///
/// `total = successful + dropped + awaiting acknowledgment`.
///
/// Packets are attributed to the window they *arrived* in. A packet that
/// arrived before `window_start` is not counted even if it resolved
/// within the window: a packet held in the queue for longer than the
/// aggregation window before resolving shows up in no snapshot. Widen
/// the window if such waits are expected.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSnapshot {
    pub priority: Priority,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    /// resolved packets that arrived within the window
    pub total: u64,
    /// acknowledged packets
    pub successful: u64,
    pub dropped: u64,
    /// mean latency of the packets with a recorded latency, zero if none
    pub avg_latency: Duration,
    /// acknowledged payload, in kilobits per second of window
    pub throughput_kbps: f64,
    /// `dropped / total`, zero if `total` is zero
    pub loss_rate: f64,
}

/// Computes [`AnalyticsSnapshot`]s from packet records.
///
/// The aggregator holds no state of its own besides its window: it can
/// be cloned and moved to another thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    window: Duration,
}

/// The input of one aggregation cycle: a point-in-time copy of the
/// records of the packets that arrived within the window.
#[derive(Debug, Clone)]
pub struct AnalyticsJob {
    pub window_end: Timestamp,
    pub records: Vec<PacketRecord>,
}

#[derive(Default)]
struct Tally {
    total: u64,
    successful: u64,
    dropped: u64,
    latency_sum: Duration,
    latency_count: u32,
    delivered_bytes: u64,
}

impl Aggregator {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the window ending at `window_end`.
    pub fn window_start(&self, window_end: Timestamp) -> Timestamp {
        window_end.saturating_sub(self.window)
    }

    /// One snapshot per priority level, from the highest to the lowest.
    ///
    /// Records of packets that arrived outside of
    /// `[window_end - window, window_end]` are ignored, so the caller may
    /// pass the whole history.
    pub fn aggregate<'a, I>(&self, records: I, window_end: Timestamp) -> Vec<AnalyticsSnapshot>
    where
        I: IntoIterator<Item = &'a PacketRecord>,
    {
        let window_start = self.window_start(window_end);
        let mut tallies: [Tally; 4] = Default::default();

        for record in records {
            let Some(arrival) = record.queued_at() else {
                continue;
            };
            if arrival < window_start || arrival > window_end {
                continue;
            }
            if !record.status().is_resolved() {
                continue;
            }

            let tally = &mut tallies[record.priority().index()];
            tally.total += 1;
            match record.status() {
                PacketStatus::Acknowledged => {
                    tally.successful += 1;
                    tally.delivered_bytes += record.bytes_size();
                }
                PacketStatus::Dropped => tally.dropped += 1,
                _ => (),
            }
            if let Some(latency) = record.latency() {
                tally.latency_sum += latency;
                tally.latency_count += 1;
            }
        }

        let window_secs = self.window.as_secs_f64();
        Priority::ALL
            .into_iter()
            .map(|priority| {
                let tally = &tallies[priority.index()];
                let avg_latency = tally
                    .latency_sum
                    .checked_div(tally.latency_count)
                    .unwrap_or(Duration::ZERO);
                let throughput_kbps = if window_secs > 0.0 {
                    (tally.delivered_bytes * 8) as f64 / window_secs / 1_000.0
                } else {
                    0.0
                };
                let loss_rate = if tally.total == 0 {
                    0.0
                } else {
                    tally.dropped as f64 / tally.total as f64
                };

                AnalyticsSnapshot {
                    priority,
                    window_start,
                    window_end,
                    total: tally.total,
                    successful: tally.successful,
                    dropped: tally.dropped,
                    avg_latency,
                    throughput_kbps,
                    loss_rate,
                }
            })
            .collect()
    }

    /// Run an aggregation cycle prepared by the scheduler.
    pub fn run(&self, job: &AnalyticsJob) -> Vec<AnalyticsSnapshot> {
        self.aggregate(&job.records, job.window_end)
    }
}

/// The snapshots computed so far, oldest first.
#[derive(Debug, Clone)]
pub struct SnapshotArchive {
    retention: Duration,
    snapshots: VecDeque<AnalyticsSnapshot>,
}

impl SnapshotArchive {
    /// Create an archive keeping snapshots for `retention`.
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            snapshots: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn extend<I>(&mut self, snapshots: I)
    where
        I: IntoIterator<Item = AnalyticsSnapshot>,
    {
        self.snapshots.extend(snapshots);
    }

    /// Forget the snapshots whose window ended more than `retention` ago.
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let horizon = now.saturating_sub(self.retention);
        let len = self.snapshots.len();
        while self
            .snapshots
            .front()
            .is_some_and(|snapshot| snapshot.window_end < horizon)
        {
            self.snapshots.pop_front();
        }
        len - self.snapshots.len()
    }

    /// The snapshots whose window ended within `lookback` of `now`,
    /// oldest first.
    pub fn query(&self, now: Timestamp, lookback: Duration) -> Vec<AnalyticsSnapshot> {
        let since = now.saturating_sub(lookback);
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.window_end >= since)
            .cloned()
            .collect()
    }

    /// The most recent snapshot of `priority`.
    pub fn latest(&self, priority: Priority) -> Option<&AnalyticsSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|snapshot| snapshot.priority == priority)
    }
}
