mod config;
mod round;

use crate::{
    analytics::{Aggregator, AnalyticsJob, AnalyticsSnapshot, SnapshotArchive},
    data::Data,
    history::History,
    link::{Link, LinkConfig, LinkState},
    measure::sample,
    packet::{Packet, PacketId, PacketIdGenerator, PacketRecord, PacketStatus, SubmitError},
    priority::Priority,
    queue::{PriorityQueue, QueueDepth},
    stats::{SchedulerStats, TransmissionStats},
    store::PacketStore,
    time::Timestamp,
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::{cmp::Reverse, collections::BinaryHeap, mem, time::Duration};
use tracing::{debug, info, trace, warn};

pub use self::{
    config::{AnalyticsMode, ConfigError, SchedulerConfig},
    round::Round,
};

/// This is the entry point of [`prionet_core`].
///
/// The [`Scheduler`] owns the priority queue, the shared [`Link`] and
/// the transmissions in flight. It is the only one deciding which packet
/// goes over the air and the only one moving packets along their
/// lifecycle.
///
/// Nothing happens between two calls to [`advance_with`]: the scheduler
/// is a deterministic state machine driven by the caller. Each call
/// moves the simulated time forward and runs one tick:
///
/// 0. acknowledge the transmitted packets whose acknowledgment is due;
/// 1. if the link is inactive while a transmission is in flight, hold
///    everything;
/// 2. if `CRITICAL` packets are waiting and the free slots cannot take
///    them all, preempt lower priority transmissions to make room;
/// 3. start transmitting from the head of the queue while the link is
///    active and the in-flight bound allows it;
/// 4. resolve the transmissions whose duration elapsed, then recompute
///    the link utilization;
/// 5. run the analytics cycle if it is due.
///
/// ```
/// use prionet_core::{
///     link::LinkConfig,
///     packet::Packet,
///     priority::Priority,
///     scheduler::{Scheduler, SchedulerConfig},
///     store::NullStore,
/// };
///
/// let mut scheduler: Scheduler<&'static str> =
///     Scheduler::new(SchedulerConfig::default(), LinkConfig::default(), NullStore).unwrap();
///
/// let packet = Packet::builder(scheduler.packet_id_generator())
///     .sender("ambulance-12")
///     .packet_type("emergency")
///     .priority(Priority::Critical)
///     .data("cardiac arrest, 2 min out")
///     .build()
///     .unwrap();
/// let id = scheduler.submit(packet).unwrap();
///
/// scheduler.tick();
/// assert_eq!(scheduler.in_flight_ids(), [id]);
/// ```
///
/// [`prionet_core`]: crate
/// [`advance_with`]: Scheduler::advance_with
pub struct Scheduler<T> {
    config: SchedulerConfig,

    packet_id_generator: PacketIdGenerator,

    round: Round,

    now: Timestamp,

    queue: PriorityQueue<T>,

    link: Link,

    /// never holds more than `config.max_in_flight` entries between ticks
    in_flight: Vec<Transmission<T>>,

    /// transmitted packets, by acknowledgment time
    pending_acks: BinaryHeap<Reverse<(Timestamp, PacketId)>>,

    ledger: Ledger,

    /// Single source of randomness: loss draws, utilization jitter and
    /// acknowledgment delays. Reseed with [`Scheduler::set_seed`] to
    /// replay a run.
    rng: ChaChaRng,

    aggregator: Aggregator,
    next_aggregation: Timestamp,
    analytics_jobs: Vec<AnalyticsJob>,
    archive: SnapshotArchive,
}

struct Transmission<T> {
    packet: Packet<T>,
    started_at: Timestamp,
    duration: Duration,
    warned: bool,
}

/// The history and the store follow every transition together.
struct Ledger {
    history: History,
    store: Box<dyn PacketStore>,
}

impl<T> Transmission<T> {
    fn ends_at(&self) -> Timestamp {
        self.started_at + self.duration
    }
}

impl Ledger {
    fn admit(&mut self, record: &PacketRecord) {
        self.history.record(record);
        if let Err(error) = self.store.insert_packet(record) {
            warn!(packet = %record.id(), %error, "Failed to persist new packet");
        }
    }

    fn update(&mut self, record: &PacketRecord) {
        self.history.record(record);
        if let Err(error) = self.store.update_packet_status(record) {
            warn!(
                packet = %record.id(),
                status = %record.status(),
                %error,
                "Failed to persist packet status"
            );
        }
    }

    fn link(&mut self, state: &LinkState) {
        if let Err(error) = self.store.upsert_link_state(state) {
            warn!(link = %state.id, %error, "Failed to persist link state");
        }
    }

    fn snapshot(&mut self, snapshot: &AnalyticsSnapshot) {
        if let Err(error) = self.store.insert_analytics_snapshot(snapshot) {
            warn!(priority = %snapshot.priority, %error, "Failed to persist analytics snapshot");
        }
    }
}

impl<T> Scheduler<T>
where
    T: Data,
{
    /// Create a scheduler driving the link described by `link`.
    ///
    /// Every admission, transition, link update and analytics snapshot
    /// is reported to `store`.
    ///
    /// # Errors
    ///
    /// Fails if the `config` does not pass [`SchedulerConfig::validate`].
    pub fn new<S>(config: SchedulerConfig, link: LinkConfig, store: S) -> Result<Self, ConfigError>
    where
        S: PacketStore,
    {
        config.validate()?;
        link.validate()?;

        let link = Link::new(link, &config.utilization, &config.loss);
        let mut ledger = Ledger {
            history: History::new(),
            store: Box::new(store),
        };
        ledger.link(&link.state());

        info!(
            link = %link.id(),
            capacity = %link.capacity(),
            max_in_flight = config.max_in_flight,
            seed = config.seed,
            "Scheduler created"
        );

        Ok(Self {
            packet_id_generator: PacketIdGenerator::new(),
            round: Round::ZERO,
            now: Timestamp::ZERO,
            queue: PriorityQueue::new(),
            link,
            in_flight: Vec::with_capacity(config.max_in_flight),
            pending_acks: BinaryHeap::new(),
            ledger,
            rng: ChaChaRng::seed_from_u64(config.seed),
            aggregator: Aggregator::new(config.aggregation_window),
            next_aggregation: Timestamp::ZERO + config.aggregation_interval,
            analytics_jobs: Vec::new(),
            archive: SnapshotArchive::new(config.snapshot_retention),
            config,
        })
    }

    /// Re-seed the scheduler's random-number generator.
    ///
    /// Loss decisions, utilization jitter and acknowledgment delays are
    /// all drawn from it: the same seed and the same calls replay the
    /// same run.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaChaRng::seed_from_u64(seed);
    }

    /// Returns the shared [`PacketIdGenerator`] for this scheduler.
    ///
    /// Pass this to [`Packet::builder`] when constructing packets. Clones
    /// share the same counter.
    pub fn packet_id_generator(&self) -> &PacketIdGenerator {
        &self.packet_id_generator
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    #[inline]
    pub fn round(&self) -> Round {
        self.round
    }

    /// Admit a packet into the queue.
    ///
    /// The packet's arrival time is the current simulated time. It will
    /// be considered for transmission at the next tick.
    ///
    /// # Errors
    ///
    /// [`SubmitError::AlreadyScheduled`] if a packet with the same
    /// identifier was already submitted to this scheduler. All the other
    /// validations happen when the packet is built.
    pub fn submit(&mut self, mut packet: Packet<T>) -> Result<PacketId, SubmitError> {
        let id = packet.id();
        if self.queue.contains(id) || self.ledger.history.contains(id) {
            return Err(SubmitError::AlreadyScheduled { id });
        }

        packet.record_mut().queued_at = Some(self.now);
        let record = packet.record().clone();

        self.queue
            .push(packet)
            .map_err(|packet| SubmitError::AlreadyScheduled { id: packet.id() })?;
        self.ledger.admit(&record);

        debug!(
            packet = %id,
            priority = %record.priority(),
            packet_type = record.packet_type(),
            bytes = record.bytes_size(),
            "Packet queued"
        );

        Ok(id)
    }

    /// Pending packets per priority level.
    pub fn queue_depth(&self) -> QueueDepth {
        self.queue.depth()
    }

    /// The queued packets, in the order they would be transmitted.
    pub fn queued_ids(&self) -> Vec<PacketId> {
        self.queue.ordered_ids()
    }

    /// The packets occupying the link, in the order they started.
    pub fn in_flight_ids(&self) -> Vec<PacketId> {
        self.in_flight.iter().map(|t| t.packet.id()).collect()
    }

    #[inline]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Nothing queued, nothing in flight and no acknowledgment pending.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty() && self.pending_acks.is_empty()
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn link_states(&self) -> Vec<LinkState> {
        vec![self.link.state()]
    }

    /// Bring the link up or down.
    ///
    /// While the link is down nothing new is transmitted and the
    /// transmissions in flight are held.
    pub fn set_link_active(&mut self, active: bool) {
        if self.link.is_active() == active {
            return;
        }
        self.link.set_active(active);
        self.ledger.link(&self.link.state());

        info!(link = %self.link.id(), active, "Link state changed");
    }

    /// The latest known record of every packet still in the history.
    pub fn history(&self) -> &History {
        &self.ledger.history
    }

    pub fn record(&self, id: PacketId) -> Option<&PacketRecord> {
        self.ledger.history.get(id)
    }

    /// The analytics snapshots computed within `lookback` of now, oldest
    /// first.
    pub fn analytics(&self, lookback: Duration) -> Vec<AnalyticsSnapshot> {
        self.archive.query(self.now, lookback)
    }

    /// The aggregator to run the jobs of an [`AnalyticsMode::Offloaded`]
    /// scheduler with.
    pub fn aggregator(&self) -> Aggregator {
        self.aggregator
    }

    /// Take the analytics cycles prepared since the last call.
    ///
    /// Always empty for an [`AnalyticsMode::Inline`] scheduler.
    pub fn take_analytics_jobs(&mut self) -> Vec<AnalyticsJob> {
        mem::take(&mut self.analytics_jobs)
    }

    /// Record the outcome of an analytics cycle: the snapshots are
    /// reported to the store and become visible to [`Self::analytics`].
    pub fn publish_snapshots(&mut self, snapshots: Vec<AnalyticsSnapshot>) {
        for snapshot in &snapshots {
            self.ledger.snapshot(snapshot);
        }
        debug!(count = snapshots.len(), "Analytics snapshots published");

        self.archive.extend(snapshots);
        let pruned = self.archive.prune(self.now);
        if pruned > 0 {
            trace!(pruned, "Expired analytics snapshots removed");
        }
    }

    /// Returns a point-in-time snapshot of the scheduler state.
    pub fn stats(&self) -> SchedulerStats {
        let in_flight = self
            .in_flight
            .iter()
            .map(|t| TransmissionStats {
                id: t.packet.id(),
                priority: t.packet.priority(),
                started_at: t.started_at,
                duration: t.duration,
                retry_count: t.packet.record().retry_count(),
            })
            .collect();

        SchedulerStats {
            round: self.round,
            now: self.now,
            queue_depth: self.queue.depth(),
            in_flight,
            awaiting_ack: self.pending_acks.len(),
            history_len: self.ledger.history.len(),
            snapshots: self.archive.len(),
            link: self.link.state(),
        }
    }

    /// Advance by the configured tick interval.
    pub fn tick(&mut self) {
        self.advance(self.config.tick_interval)
    }

    pub fn advance(&mut self, duration: Duration) {
        self.advance_with(duration, |_| ())
    }

    /// Move the simulated time forward by `duration` and run one tick.
    ///
    /// `handle` is called with the record of every packet that reached a
    /// terminal status (`Acknowledged` or `Dropped`) during this step.
    pub fn advance_with<H>(&mut self, duration: Duration, mut handle: H)
    where
        H: FnMut(&PacketRecord),
    {
        self.round = self.round.next();
        self.now = self.now + duration;
        trace!(round = %self.round, now = %self.now, queue = %self.queue.depth(), "Tick");

        self.acknowledge(&mut handle);

        if !self.in_flight.is_empty() && !self.link.is_active() {
            trace!(
                in_flight = self.in_flight.len(),
                "Link inactive, transmissions on hold"
            );
        } else {
            self.preempt(&mut handle);
            self.start_transmissions();
            self.resolve_transmissions(&mut handle);
        }

        self.watchdog();
        self.analytics_cycle();

        debug_assert!(
            self.in_flight.len() <= self.config.max_in_flight,
            "{} transmissions in flight, at most {} allowed",
            self.in_flight.len(),
            self.config.max_in_flight
        );
    }

    fn acknowledge<H>(&mut self, handle: &mut H)
    where
        H: FnMut(&PacketRecord),
    {
        while let Some(&Reverse((due, id))) = self.pending_acks.peek() {
            if due > self.now {
                break;
            }
            self.pending_acks.pop();

            let Some(mut record) = self.ledger.history.get(id).cloned() else {
                continue;
            };
            record.transition(PacketStatus::Acknowledged);
            record.acknowledged_at = Some(due);
            self.ledger.update(&record);

            debug!(packet = %id, acknowledged_at = %due, "Packet acknowledged");
            handle(&record);
        }
    }

    /// Waiting `CRITICAL` packets take the link from lower priority
    /// transmissions, only as many as the free slots cannot accommodate.
    /// The lowest priority goes first, then the most recently started.
    /// Transmissions already over are left to resolve.
    fn preempt<H>(&mut self, handle: &mut H)
    where
        H: FnMut(&PacketRecord),
    {
        let waiting = self.queue.depth().get(Priority::Critical);
        let free = self
            .config
            .max_in_flight
            .saturating_sub(self.in_flight.len());
        let needed = waiting.saturating_sub(free);
        if needed == 0 {
            return;
        }

        let now = self.now;
        let mut victims: Vec<usize> = self
            .in_flight
            .iter()
            .enumerate()
            .filter(|(_, t)| t.packet.priority() < Priority::Critical && t.ends_at() > now)
            .map(|(index, _)| index)
            .collect();
        victims.sort_by_key(|&index| {
            let t = &self.in_flight[index];
            (t.packet.priority(), Reverse(t.started_at))
        });
        victims.truncate(needed);
        // remove from the back so the remaining indices stay valid
        victims.sort_unstable_by(|a, b| b.cmp(a));
        let preempted: Vec<_> = victims
            .into_iter()
            .map(|index| self.in_flight.remove(index))
            .collect();

        for transmission in preempted {
            let mut packet = transmission.packet;
            let record = packet.record_mut();
            record.retry_count += 1;

            if record.retry_count > record.max_retries {
                record.transition(PacketStatus::Dropped);
                record.transmission_ended_at = Some(now);

                let record = packet.into_record();
                debug!(
                    packet = %record.id(),
                    priority = %record.priority(),
                    retry_count = record.retry_count(),
                    "Packet preempted with no retry left, dropped"
                );
                self.ledger.update(&record);
                handle(&record);
            } else {
                record.transition(PacketStatus::Queued);
                debug!(
                    packet = %packet.id(),
                    priority = %packet.priority(),
                    retry_count = packet.record().retry_count(),
                    "Packet preempted"
                );
                self.requeue(packet);
            }
        }
    }

    fn start_transmissions(&mut self) {
        while self.in_flight.len() < self.config.max_in_flight && self.link.is_active() {
            let Some(mut packet) = self.queue.pop() else {
                break;
            };

            let duration = self
                .link
                .transmission_duration(packet.record().bytes_size(), self.config.transmission_floor);
            let record = packet.record_mut();
            record.transition(PacketStatus::Transmitting);
            record.transmission_started_at = Some(self.now);
            self.ledger.update(packet.record());

            debug!(
                packet = %packet.id(),
                priority = %packet.priority(),
                duration = ?duration,
                "Transmission started"
            );

            self.in_flight.push(Transmission {
                packet,
                started_at: self.now,
                duration,
                warned: false,
            });
        }

        if !self.link.is_active() && !self.queue.is_empty() {
            trace!(queued = self.queue.len(), "Link inactive, nothing transmitted");
        }
    }

    fn resolve_transmissions<H>(&mut self, handle: &mut H)
    where
        H: FnMut(&PacketRecord),
    {
        let now = self.now;
        let (done, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|t| t.ends_at() <= now);
        self.in_flight = pending;

        if done.is_empty() {
            return;
        }

        for transmission in done {
            let ended_at = transmission.ends_at();
            let lost = self.link.should_drop_packet(&mut self.rng);

            let mut packet = transmission.packet;
            let record = packet.record_mut();
            record.transmission_ended_at = Some(ended_at);

            if lost && !record.retries_exhausted() {
                record.transition(PacketStatus::Failed);
                record.retry_count += 1;
                self.ledger.update(packet.record());

                debug!(
                    packet = %packet.id(),
                    priority = %packet.priority(),
                    retry_count = packet.record().retry_count(),
                    "Transmission lost, retrying"
                );

                packet.record_mut().transition(PacketStatus::Queued);
                self.requeue(packet);
            } else if lost {
                record.transition(PacketStatus::Dropped);

                let record = packet.into_record();
                debug!(
                    packet = %record.id(),
                    priority = %record.priority(),
                    retry_count = record.retry_count(),
                    "Transmission lost with no retry left, dropped"
                );
                self.ledger.update(&record);
                handle(&record);
            } else {
                record.transition(PacketStatus::Transmitted);
                record.latency = Some(transmission.duration + self.link.jitter());

                let delay = sample::duration_between(
                    &mut self.rng,
                    self.config.ack_delay_min,
                    self.config.ack_delay_max,
                );
                self.pending_acks
                    .push(Reverse((ended_at + delay, packet.id())));

                // the payload is released here, only the record remains
                let record = packet.into_record();
                debug!(
                    packet = %record.id(),
                    priority = %record.priority(),
                    latency = ?record.latency(),
                    "Packet transmitted"
                );
                self.ledger.update(&record);
            }
        }

        self.link.update_utilization(
            self.in_flight.len(),
            &self.config.utilization,
            &self.config.loss,
            now,
            &mut self.rng,
        );
        self.ledger.link(&self.link.state());

        trace!(
            utilization = self.link.utilization(),
            packet_loss = %self.link.packet_loss(),
            "Link updated"
        );
    }

    fn requeue(&mut self, packet: Packet<T>) {
        self.ledger.update(packet.record());
        if let Err(packet) = self.queue.push(packet) {
            warn!(packet = %packet.id(), "Packet already queued, retry ignored");
        }
    }

    fn watchdog(&mut self) {
        for transmission in self.in_flight.iter_mut().filter(|t| !t.warned) {
            let elapsed = self.now.duration_since(transmission.started_at);
            if elapsed > self.config.watchdog {
                transmission.warned = true;
                warn!(
                    packet = %transmission.packet.id(),
                    priority = %transmission.packet.priority(),
                    elapsed = ?elapsed,
                    link_active = self.link.is_active(),
                    "Transmission in flight for too long"
                );
            }
        }
    }

    fn analytics_cycle(&mut self) {
        if self.now < self.next_aggregation {
            return;
        }
        while self.next_aggregation <= self.now {
            self.next_aggregation = self.next_aggregation + self.config.aggregation_interval;
        }

        let window_end = self.now;
        let window_start = self.aggregator.window_start(window_end);
        let records = self.ledger.history.window(window_start, window_end);

        match self.config.analytics {
            AnalyticsMode::Inline => {
                let snapshots = self.aggregator.aggregate(records, window_end);
                self.publish_snapshots(snapshots);
            }
            AnalyticsMode::Offloaded => {
                let records = records.cloned().collect();
                self.analytics_jobs.push(AnalyticsJob {
                    window_end,
                    records,
                });
            }
        }

        let retention = self
            .config
            .history_retention
            .max(self.config.aggregation_window);
        let pruned = self
            .ledger
            .history
            .prune_terminal_before(self.now.saturating_sub(retention));
        if pruned > 0 {
            trace!(pruned, "Expired packet records removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        link::LossModel,
        measure::PacketLoss,
        store::{MemoryStore, StoreError},
    };

    const TICK: Duration = Duration::from_millis(100);

    fn config(loss: PacketLoss) -> SchedulerConfig {
        SchedulerConfig::default().set_loss_model(LossModel::Fixed(loss))
    }

    fn scheduler(config: SchedulerConfig) -> (Scheduler<Vec<u8>>, MemoryStore) {
        let store = MemoryStore::new();
        let scheduler = Scheduler::new(config, LinkConfig::default(), store.clone()).unwrap();
        (scheduler, store)
    }

    fn submit(scheduler: &mut Scheduler<Vec<u8>>, priority: Priority, bytes: usize) -> PacketId {
        let packet = Packet::builder(scheduler.packet_id_generator())
            .sender("ambulance-1")
            .packet_type("status")
            .priority(priority)
            .data(vec![0; bytes])
            .build()
            .unwrap();
        scheduler.submit(packet).unwrap()
    }

    fn status(scheduler: &Scheduler<Vec<u8>>, id: PacketId) -> PacketStatus {
        scheduler.record(id).unwrap().status()
    }

    /// statuses reported to the store for `id`, admission included
    fn transitions(store: &MemoryStore, id: PacketId) -> Vec<PacketStatus> {
        let content = store.content();
        content
            .packets
            .iter()
            .chain(&content.status_updates)
            .filter(|r| r.id() == id)
            .map(PacketRecord::status)
            .collect()
    }

    fn run_until_idle(scheduler: &mut Scheduler<Vec<u8>>) -> Vec<PacketRecord> {
        let mut terminal = Vec::new();
        for _ in 0..10_000 {
            scheduler.advance_with(TICK, |record| terminal.push(record.clone()));
            if scheduler.is_idle() {
                return terminal;
            }
        }
        panic!("scheduler did not go idle: {:?}", scheduler.stats());
    }

    struct FailingStore;

    impl PacketStore for FailingStore {
        fn insert_packet(&mut self, _: &PacketRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_owned()))
        }

        fn update_packet_status(&mut self, _: &PacketRecord) -> Result<(), StoreError> {
            Err(StoreError::Rejected("read-only replica".to_owned()))
        }

        fn upsert_link_state(&mut self, _: &LinkState) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_owned()))
        }

        fn insert_analytics_snapshot(&mut self, _: &AnalyticsSnapshot) -> Result<(), StoreError> {
            Err(anyhow::anyhow!("disk full").into())
        }
    }

    #[test]
    fn invalid_config() {
        let config = SchedulerConfig::default().set_max_in_flight(0);
        let result = Scheduler::<()>::new(config, LinkConfig::default(), MemoryStore::new());

        assert!(matches!(result, Err(ConfigError::ZeroMaxInFlight)));
    }

    #[test]
    fn zero_capacity_link() {
        let link = LinkConfig {
            capacity: "0bps".parse().unwrap(),
            ..LinkConfig::default()
        };
        let result = Scheduler::<()>::new(config(PacketLoss::None), link, MemoryStore::new());

        assert!(matches!(result, Err(ConfigError::ZeroLinkCapacity)));
    }

    #[test]
    fn submit_records_arrival() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::None));
        scheduler.advance(Duration::from_millis(250));

        let id = submit(&mut scheduler, Priority::Medium, 100);

        let record = scheduler.record(id).unwrap();
        assert_eq!(record.status(), PacketStatus::Queued);
        assert_eq!(
            record.queued_at(),
            Some(Timestamp::ZERO + Duration::from_millis(250))
        );
        assert_eq!(scheduler.queue_depth().get(Priority::Medium), 1);
        assert_eq!(store.content().packets.len(), 1);
    }

    #[test]
    fn submit_twice() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None));
        let id = submit(&mut scheduler, Priority::Low, 10);

        // a foreign generator hands out the same identifier
        let packet = Packet::builder(&PacketIdGenerator::new())
            .sender("hospital-1")
            .packet_type("status")
            .priority(Priority::Low)
            .data(vec![1])
            .build()
            .unwrap();

        assert_eq!(
            scheduler.submit(packet).unwrap_err(),
            SubmitError::AlreadyScheduled { id }
        );
        assert_eq!(scheduler.queue_depth().total(), 1);
    }

    #[test]
    fn critical_transmits_first() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None));
        let low = submit(&mut scheduler, Priority::Low, 1_000);
        let critical = submit(&mut scheduler, Priority::Critical, 1_000);

        scheduler.tick();

        assert_eq!(scheduler.in_flight_ids(), [critical]);
        assert_eq!(status(&scheduler, critical), PacketStatus::Transmitting);
        assert_eq!(status(&scheduler, low), PacketStatus::Queued);
    }

    #[test]
    fn critical_preempts_low() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None));
        // ~840ms on the default link
        let low = submit(&mut scheduler, Priority::Low, 100_000);
        scheduler.tick();
        assert_eq!(status(&scheduler, low), PacketStatus::Transmitting);

        let later_low = submit(&mut scheduler, Priority::Low, 1_000);
        let critical = submit(&mut scheduler, Priority::Critical, 1_000);
        scheduler.tick();

        let record = scheduler.record(low).unwrap();
        assert_eq!(record.status(), PacketStatus::Queued);
        assert_eq!(record.retry_count(), 1);
        assert_eq!(scheduler.in_flight_ids(), [critical]);
        // back to its original place, ahead of the packets that arrived
        // after it
        assert_eq!(scheduler.queued_ids(), [low, later_low]);
    }

    #[test]
    fn critical_is_never_preempted() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None));
        let first = submit(&mut scheduler, Priority::Critical, 100_000);
        scheduler.tick();

        let second = submit(&mut scheduler, Priority::Critical, 1_000);
        scheduler.tick();

        assert_eq!(scheduler.in_flight_ids(), [first]);
        assert_eq!(scheduler.record(first).unwrap().retry_count(), 0);
        assert_eq!(scheduler.queued_ids(), [second]);
    }

    #[test]
    fn critical_uses_free_slots_before_preempting() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None).set_max_in_flight(4));
        let low = submit(&mut scheduler, Priority::Low, 100_000);
        scheduler.tick();

        // one critical packet on each of the next two ticks
        submit(&mut scheduler, Priority::Critical, 1_000);
        scheduler.tick();
        submit(&mut scheduler, Priority::Critical, 1_000);
        scheduler.tick();

        let record = scheduler.record(low).unwrap();
        assert_eq!(record.status(), PacketStatus::Transmitting);
        assert_eq!(record.retry_count(), 0);
        assert!(scheduler.in_flight_ids().contains(&low));
    }

    #[test]
    fn preemption_takes_the_lowest_priority_first() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None).set_max_in_flight(2));
        let medium = submit(&mut scheduler, Priority::Medium, 100_000);
        let low = submit(&mut scheduler, Priority::Low, 100_000);
        scheduler.tick();
        assert_eq!(scheduler.in_flight_ids(), [medium, low]);

        let critical = submit(&mut scheduler, Priority::Critical, 100_000);
        scheduler.tick();

        assert_eq!(scheduler.in_flight_ids(), [medium, critical]);
        assert_eq!(scheduler.record(medium).unwrap().retry_count(), 0);
        let record = scheduler.record(low).unwrap();
        assert_eq!(record.status(), PacketStatus::Queued);
        assert_eq!(record.retry_count(), 1);
    }

    #[test]
    fn preemption_beyond_retry_budget_drops() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::None));
        let medium = submit(&mut scheduler, Priority::Medium, 100_000);

        scheduler.tick();
        submit(&mut scheduler, Priority::Critical, 1_000);
        scheduler.tick();
        assert_eq!(status(&scheduler, medium), PacketStatus::Queued);

        // the first critical packet resolves, then the medium one resumes
        scheduler.tick();
        scheduler.tick();
        assert_eq!(scheduler.in_flight_ids(), [medium]);

        submit(&mut scheduler, Priority::Critical, 1_000);
        let mut dropped = Vec::new();
        scheduler.advance_with(TICK, |record| dropped.push(record.id()));

        let record = scheduler.record(medium).unwrap();
        assert_eq!(record.status(), PacketStatus::Dropped);
        assert_eq!(record.retry_count(), 2);
        assert_eq!(dropped, [medium]);
        assert_eq!(
            transitions(&store, medium),
            [
                PacketStatus::Queued,
                PacketStatus::Transmitting,
                PacketStatus::Queued,
                PacketStatus::Transmitting,
                PacketStatus::Dropped,
            ]
        );
    }

    #[test]
    fn lost_twice_is_dropped() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::rate(1.0).unwrap()));
        let id = submit(&mut scheduler, Priority::Medium, 1_000);

        let terminal = run_until_idle(&mut scheduler);

        let record = scheduler.record(id).unwrap();
        assert_eq!(record.status(), PacketStatus::Dropped);
        assert_eq!(record.retry_count(), 1);
        assert_eq!(record.max_retries(), 1);
        assert_eq!(terminal.len(), 1);
        assert_eq!(
            transitions(&store, id),
            [
                PacketStatus::Queued,
                PacketStatus::Transmitting,
                PacketStatus::Failed,
                PacketStatus::Queued,
                PacketStatus::Transmitting,
                PacketStatus::Dropped,
            ]
        );
    }

    #[test]
    fn critical_gets_five_retries() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::rate(1.0).unwrap()));
        let id = submit(&mut scheduler, Priority::Critical, 1_000);

        run_until_idle(&mut scheduler);

        let record = scheduler.record(id).unwrap();
        assert_eq!(record.status(), PacketStatus::Dropped);
        assert_eq!(record.retry_count(), 5);
    }

    #[test]
    fn delivered_and_acknowledged() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::None));
        let id = submit(&mut scheduler, Priority::High, 1_000);

        let terminal = run_until_idle(&mut scheduler);

        let record = scheduler.record(id).unwrap();
        assert_eq!(record.status(), PacketStatus::Acknowledged);
        assert_eq!(
            transitions(&store, id),
            [
                PacketStatus::Queued,
                PacketStatus::Transmitting,
                PacketStatus::Transmitted,
                PacketStatus::Acknowledged,
            ]
        );

        let started = record.transmission_started_at().unwrap();
        let ended = record.transmission_ended_at().unwrap();
        let acknowledged = record.acknowledged_at().unwrap();
        assert_eq!(
            record.latency(),
            Some(ended.duration_since(started) + scheduler.link().jitter())
        );
        let ack_delay = acknowledged.duration_since(ended);
        assert!(ack_delay >= Duration::from_millis(50), "{ack_delay:?}");
        assert!(ack_delay <= Duration::from_millis(150), "{ack_delay:?}");
        assert_eq!(terminal.len(), 1);
        assert_eq!(terminal[0].id(), id);
    }

    #[test]
    fn in_flight_bound() {
        let config = config(PacketLoss::None).set_max_in_flight(3);
        let (mut scheduler, _) = scheduler(config);
        for _ in 0..12 {
            submit(&mut scheduler, Priority::Medium, 50_000);
        }

        let mut max_seen = 0;
        for _ in 0..200 {
            scheduler.tick();
            assert!(scheduler.in_flight_len() <= 3);
            max_seen = max_seen.max(scheduler.in_flight_len());
        }
        assert_eq!(max_seen, 3);
    }

    #[test]
    fn every_packet_terminates() {
        let (mut scheduler, _) = scheduler(SchedulerConfig::default().set_seed(7));
        let mut ids = Vec::new();
        for i in 0..60 {
            let priority = Priority::ALL[i % 4];
            ids.push(submit(&mut scheduler, priority, 200 + i * 100));
        }

        let terminal = run_until_idle(&mut scheduler);

        assert_eq!(terminal.len(), ids.len());
        for id in ids {
            let record = scheduler.record(id).unwrap();
            assert!(record.status().is_terminal(), "{id}: {}", record.status());
            // a preemption past the budget counts one more attempt
            assert!(record.retry_count() <= record.max_retries() + 1);
        }
    }

    #[test]
    fn same_seed_same_run() {
        fn run(seed: u64) -> Vec<(PacketStatus, u32, Option<Timestamp>)> {
            let config = SchedulerConfig::default()
                .set_loss_model(LossModel::Utilization {
                    base: 0.3,
                    max: 0.6,
                })
                .set_seed(seed);
            let (mut scheduler, _) = scheduler(config);
            for i in 0..20 {
                submit(&mut scheduler, Priority::ALL[i % 4], 5_000);
            }
            run_until_idle(&mut scheduler);
            scheduler
                .history()
                .iter()
                .map(|r| (r.status(), r.retry_count(), r.acknowledged_at()))
                .collect()
        }

        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn store_failures_do_not_stall_scheduling() {
        let mut scheduler: Scheduler<Vec<u8>> =
            Scheduler::new(config(PacketLoss::None), LinkConfig::default(), FailingStore)
                .unwrap();
        let ids: Vec<_> = (0..3)
            .map(|_| submit(&mut scheduler, Priority::High, 1_000))
            .collect();

        for _ in 0..200 {
            scheduler.tick();
        }

        for id in ids {
            assert_eq!(status(&scheduler, id), PacketStatus::Acknowledged);
        }
        assert!(!scheduler.analytics(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn inactive_link_holds_the_queue() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::None));
        scheduler.set_link_active(false);
        let id = submit(&mut scheduler, Priority::Critical, 1_000);

        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(status(&scheduler, id), PacketStatus::Queued);
        assert!(!store.content().link_states[0].active);

        scheduler.set_link_active(true);
        scheduler.tick();
        assert_eq!(status(&scheduler, id), PacketStatus::Transmitting);
    }

    #[test]
    fn inactive_link_holds_transmissions() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None));
        let id = submit(&mut scheduler, Priority::Low, 1_000);
        scheduler.tick();
        scheduler.set_link_active(false);

        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(status(&scheduler, id), PacketStatus::Transmitting);

        scheduler.set_link_active(true);
        scheduler.tick();
        assert_eq!(status(&scheduler, id), PacketStatus::Transmitted);
    }

    #[test]
    fn utilization_updated_after_resolution() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::None));
        submit(&mut scheduler, Priority::Low, 1_000);

        scheduler.tick();
        assert_eq!(scheduler.link().state().updated_at, Timestamp::ZERO);

        scheduler.tick();
        let state = scheduler.link().state();
        assert_eq!(state.updated_at, scheduler.now());
        assert!((0.0..=10.0).contains(&state.utilization));
        assert_eq!(store.content().link_states, [state]);
    }

    #[test]
    fn analytics_cycle() {
        let (mut scheduler, store) = scheduler(config(PacketLoss::None));
        for _ in 0..5 {
            submit(&mut scheduler, Priority::Medium, 1_000);
        }

        // 10s: one aggregation cycle
        for _ in 0..100 {
            scheduler.tick();
        }

        let snapshots = scheduler.analytics(Duration::from_secs(3_600));
        assert_eq!(snapshots.len(), 4);
        let medium = snapshots
            .iter()
            .find(|s| s.priority == Priority::Medium)
            .unwrap();
        assert_eq!(medium.total, 5);
        assert_eq!(medium.successful, 5);
        assert_eq!(medium.loss_rate, 0.0);
        assert!(medium.avg_latency > Duration::ZERO);
        assert_eq!(store.content().snapshots, snapshots);
    }

    #[test]
    fn finished_records_expire() {
        // shorter than the aggregation window: the window wins
        let config = config(PacketLoss::None).set_history_retention(Duration::from_secs(30));
        let (mut scheduler, _) = scheduler(config);
        let id = submit(&mut scheduler, Priority::Medium, 1_000);

        for _ in 0..50 {
            scheduler.advance(Duration::from_secs(1));
        }
        assert_eq!(status(&scheduler, id), PacketStatus::Acknowledged);

        for _ in 0..30 {
            scheduler.advance(Duration::from_secs(1));
        }
        assert!(scheduler.record(id).is_none());
        assert!(scheduler.history().is_empty());
    }

    #[test]
    fn offloaded_analytics() {
        let config = config(PacketLoss::None).set_analytics_mode(AnalyticsMode::Offloaded);
        let (mut scheduler, _) = scheduler(config);
        submit(&mut scheduler, Priority::High, 1_000);

        for _ in 0..100 {
            scheduler.tick();
        }
        assert!(scheduler.analytics(Duration::from_secs(60)).is_empty());

        let jobs = scheduler.take_analytics_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].records.len(), 1);
        assert!(scheduler.take_analytics_jobs().is_empty());

        let aggregator = scheduler.aggregator();
        let snapshots = aggregator.run(&jobs[0]);
        scheduler.publish_snapshots(snapshots);
        assert_eq!(scheduler.analytics(Duration::from_secs(60)).len(), 4);
    }

    #[test]
    fn watchdog_warns_once() {
        let config = config(PacketLoss::None).set_watchdog(Duration::from_secs(1));
        let (mut scheduler, _) = scheduler(config);
        submit(&mut scheduler, Priority::Low, 1_000);
        scheduler.tick();
        scheduler.set_link_active(false);

        for _ in 0..20 {
            scheduler.tick();
        }
        assert!(scheduler.in_flight.iter().all(|t| t.warned));
    }

    #[test]
    fn stats() {
        let (mut scheduler, _) = scheduler(config(PacketLoss::None));
        let id = submit(&mut scheduler, Priority::High, 100_000);
        submit(&mut scheduler, Priority::Low, 1_000);
        scheduler.tick();

        let stats = scheduler.stats();
        assert_eq!(stats.round.into_u64(), 1);
        assert_eq!(stats.now, Timestamp::ZERO + TICK);
        assert_eq!(stats.queue_depth.get(Priority::Low), 1);
        assert_eq!(stats.in_flight.len(), 1);
        assert_eq!(stats.in_flight[0].id, id);
        assert_eq!(stats.awaiting_ack, 0);
        assert_eq!(stats.history_len, 2);
    }
}
