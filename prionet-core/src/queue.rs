use crate::{
    packet::{Packet, PacketId},
    priority::Priority,
    time::Timestamp,
};
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
    fmt,
};

/// Pending packets, ordered for transmission.
///
/// A packet `A` is dequeued before `B` iff `A` has a higher priority
/// weight, or the same weight and an earlier arrival time. Packets with
/// the same priority and arrival time leave in submission order.
///
/// A packet keeps the arrival time of its first submission when it is
/// pushed back after a failed or preempted attempt: a retry therefore
/// goes ahead of equal-priority packets that arrived after its first
/// attempt.
pub struct PriorityQueue<T> {
    heap: BinaryHeap<OrderedByPriority<T>>,
    members: HashSet<PacketId>,
    depth: QueueDepth,
}

/// Number of pending packets for every priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueDepth([usize; 4]);

struct OrderedByPriority<T> {
    arrival: Timestamp,
    packet: Packet<T>,
}

impl<T> OrderedByPriority<T> {
    fn key(&self) -> (Priority, Timestamp, PacketId) {
        (self.packet.priority(), self.arrival, self.packet.id())
    }
}

impl<T> PartialEq for OrderedByPriority<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for OrderedByPriority<T> {}

impl<T> PartialOrd for OrderedByPriority<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for OrderedByPriority<T> {
    /// the _greatest_ entry is the next one to leave the heap
    fn cmp(&self, other: &Self) -> Ordering {
        let (priority, arrival, id) = self.key();
        let (other_priority, other_arrival, other_id) = other.key();

        priority
            .cmp(&other_priority)
            .then_with(|| other_arrival.cmp(&arrival))
            .then_with(|| other_id.cmp(&id))
    }
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            members: HashSet::new(),
            depth: QueueDepth::default(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Insert a packet, ordered by its priority and arrival time.
    ///
    /// The arrival time is the packet's `queued_at` time. A packet that
    /// was never given one is considered to arrive at [`Timestamp::ZERO`].
    ///
    /// # Errors
    ///
    /// A packet has at most one entry in the queue. If a packet with the
    /// same identifier is already queued the packet is handed back.
    pub fn push(&mut self, packet: Packet<T>) -> Result<(), Packet<T>> {
        if !self.members.insert(packet.id()) {
            return Err(packet);
        }
        self.depth.increment(packet.priority());

        let arrival = packet.record().queued_at().unwrap_or(Timestamp::ZERO);
        self.heap.push(OrderedByPriority { arrival, packet });
        Ok(())
    }

    /// The next packet to transmit.
    pub fn peek(&self) -> Option<&Packet<T>> {
        self.heap.peek().map(|entry| &entry.packet)
    }

    /// Remove and return the next packet to transmit.
    pub fn pop(&mut self) -> Option<Packet<T>> {
        let OrderedByPriority { packet, .. } = self.heap.pop()?;
        self.members.remove(&packet.id());
        self.depth.decrement(packet.priority());
        Some(packet)
    }

    #[inline]
    pub fn contains(&self, id: PacketId) -> bool {
        self.members.contains(&id)
    }

    /// `true` iff at least one packet of exactly `priority` is queued.
    #[inline]
    pub fn has_priority(&self, priority: Priority) -> bool {
        self.depth.get(priority) > 0
    }

    /// `true` iff at least one packet of `priority` or higher is queued.
    pub fn has_priority_at_least(&self, priority: Priority) -> bool {
        Priority::ALL
            .into_iter()
            .take_while(|p| *p >= priority)
            .any(|p| self.has_priority(p))
    }

    #[inline]
    pub fn depth(&self) -> QueueDepth {
        self.depth
    }

    /// The queued packet identifiers, in the order they would be dequeued.
    pub fn ordered_ids(&self) -> Vec<PacketId> {
        let mut entries: Vec<_> = self.heap.iter().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|entry| entry.packet.id()).collect()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueDepth {
    #[inline]
    pub fn get(&self, priority: Priority) -> usize {
        self.0[priority.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// `(priority, count)` pairs, from the highest priority to the lowest.
    pub fn iter(&self) -> impl Iterator<Item = (Priority, usize)> + '_ {
        Priority::ALL.into_iter().map(|p| (p, self.get(p)))
    }

    fn increment(&mut self, priority: Priority) {
        self.0[priority.index()] += 1;
    }

    fn decrement(&mut self, priority: Priority) {
        let count = &mut self.0[priority.index()];
        debug_assert!(*count > 0, "queue depth underflow for {priority}");
        *count = count.saturating_sub(1);
    }
}

impl fmt::Display for QueueDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (priority, count) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{priority}={count}")?;
        }
        Ok(())
    }
}
