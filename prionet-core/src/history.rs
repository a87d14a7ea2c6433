use crate::{
    packet::{PacketId, PacketRecord},
    time::Timestamp,
};
use std::collections::BTreeMap;

/// The latest known record of every packet the scheduler admitted.
///
/// The scheduler overwrites a packet's entry on each status transition,
/// so an entry is always the point-in-time state of the packet after its
/// last transition. The analytics only ever read from it.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: BTreeMap<PacketId, PacketRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: PacketId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: PacketId) -> Option<&PacketRecord> {
        self.records.get(&id)
    }

    pub(crate) fn record(&mut self, record: &PacketRecord) {
        self.records.insert(record.id(), record.clone());
    }

    /// All the records, in packet identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &PacketRecord> {
        self.records.values()
    }

    /// Records of the packets that arrived in `[start, end]`.
    pub fn window(&self, start: Timestamp, end: Timestamp) -> impl Iterator<Item = &PacketRecord> {
        self.iter().filter(move |record| {
            record
                .queued_at()
                .is_some_and(|arrival| arrival >= start && arrival <= end)
        })
    }

    /// Forget packets in a terminal status that arrived before `before`.
    ///
    /// Packets still in progress are always kept. Returns how many
    /// records were removed.
    pub fn prune_terminal_before(&mut self, before: Timestamp) -> usize {
        let len = self.records.len();
        self.records.retain(|_, record| {
            !record.status().is_terminal()
                || record.queued_at().is_none_or(|arrival| arrival >= before)
        });
        len - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        packet::{Packet, PacketIdGenerator, PacketStatus},
        priority::Priority,
    };
    use std::time::Duration;

    fn record(generator: &PacketIdGenerator, arrival_s: u64, status: PacketStatus) -> PacketRecord {
        let mut record = Packet::builder(generator)
            .sender("ambulance-3")
            .packet_type("position")
            .priority(Priority::Medium)
            .data(())
            .build()
            .unwrap()
            .into_record();
        record.queued_at = Some(Timestamp::ZERO + Duration::from_secs(arrival_s));
        record.status = status;
        record
    }

    #[test]
    fn record_overwrites() {
        let generator = PacketIdGenerator::new();
        let mut history = History::new();
        let mut r = record(&generator, 1, PacketStatus::Queued);

        history.record(&r);
        r.status = PacketStatus::Transmitting;
        history.record(&r);

        assert_eq!(history.len(), 1);
        assert_eq!(
            history.get(r.id()).map(PacketRecord::status),
            Some(PacketStatus::Transmitting)
        );
    }

    #[test]
    fn window_is_inclusive() {
        let generator = PacketIdGenerator::new();
        let mut history = History::new();
        for arrival in [0, 10, 20, 30] {
            history.record(&record(&generator, arrival, PacketStatus::Queued));
        }

        let start = Timestamp::ZERO + Duration::from_secs(10);
        let end = Timestamp::ZERO + Duration::from_secs(20);
        assert_eq!(history.window(start, end).count(), 2);
    }

    #[test]
    fn prune_keeps_packets_in_progress() {
        let generator = PacketIdGenerator::new();
        let mut history = History::new();
        history.record(&record(&generator, 0, PacketStatus::Acknowledged));
        history.record(&record(&generator, 0, PacketStatus::Dropped));
        history.record(&record(&generator, 0, PacketStatus::Failed));
        history.record(&record(&generator, 100, PacketStatus::Acknowledged));

        let removed = history.prune_terminal_before(Timestamp::ZERO + Duration::from_secs(50));

        assert_eq!(removed, 2);
        assert_eq!(history.len(), 2);
    }
}
