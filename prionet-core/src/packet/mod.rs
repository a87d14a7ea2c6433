mod id;
mod status;

use crate::{
    data::Data,
    priority::{Priority, PriorityParseError},
    time::Timestamp,
};
use std::{fmt, time::Duration};
use thiserror::Error;

pub use self::{
    id::{PacketId, PacketIdGenerator},
    status::PacketStatus,
};

/// Reasons for refusing to admit a packet.
///
/// These are all invalid arguments: they are returned synchronously to the
/// caller and the packet never enters the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Missing sender information (`sender')")]
    MissingSender,
    #[error("Empty sender identifier")]
    EmptySender,
    #[error("Missing message type (`packet_type')")]
    MissingPacketType,
    #[error("Missing priority level (`priority')")]
    MissingPriority,
    #[error("{0}")]
    UnknownPriority(#[from] PriorityParseError),
    #[error("Missing packet content (`data')")]
    MissingData,
    #[error("Packet ({id}) is already scheduled")]
    AlreadyScheduled { id: PacketId },
}

/// Everything the engine knows about a packet, except its payload.
///
/// Records are what the [`PacketStore`] and the analytics receive: each
/// one is a point-in-time copy of the packet's state taken at the moment
/// of a status transition.
///
/// The priority and the retry budget are set when the packet is built
/// and cannot be changed afterwards.
///
/// [`PacketStore`]: crate::store::PacketStore
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    pub(crate) id: PacketId,
    pub(crate) sender: String,
    pub(crate) receiver: Option<String>,
    pub(crate) packet_type: String,
    pub(crate) priority: Priority,
    pub(crate) bytes_size: u64,
    pub(crate) status: PacketStatus,
    pub(crate) queued_at: Option<Timestamp>,
    pub(crate) transmission_started_at: Option<Timestamp>,
    pub(crate) transmission_ended_at: Option<Timestamp>,
    pub(crate) acknowledged_at: Option<Timestamp>,
    pub(crate) latency: Option<Duration>,
    pub(crate) retry_count: u32,
    pub(crate) max_retries: u32,
}

/// # A packet waiting for, or going through, the shared link
///
/// Made of the packet's [`PacketRecord`] and its payload. The payload
/// is released as soon as the packet went over the air or was dropped,
/// only the record remains in the history.
pub struct Packet<T> {
    record: PacketRecord,
    data: T,
}

pub struct PacketBuilder<'a, T> {
    generator: &'a PacketIdGenerator,
    sender: Option<String>,
    receiver: Option<String>,
    packet_type: Option<String>,
    priority: Option<Priority>,
    data: Option<T>,
}

impl<'a, T> PacketBuilder<'a, T>
where
    T: Data,
{
    pub fn new(generator: &'a PacketIdGenerator) -> Self {
        Self {
            generator,
            sender: None,
            receiver: None,
            packet_type: None,
            priority: None,
            data: None,
        }
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// The opaque message-type tag (`"trip_start"`, `"emergency"`, ...).
    pub fn packet_type(mut self, packet_type: impl Into<String>) -> Self {
        self.packet_type = Some(packet_type.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    /// Validate the packet and assign it a new [`PacketId`].
    ///
    /// No identifier is consumed when the validation fails.
    pub fn build(self) -> Result<Packet<T>, SubmitError> {
        let Some(sender) = self.sender else {
            return Err(SubmitError::MissingSender);
        };
        if sender.trim().is_empty() {
            return Err(SubmitError::EmptySender);
        }
        let Some(packet_type) = self.packet_type else {
            return Err(SubmitError::MissingPacketType);
        };
        let Some(priority) = self.priority else {
            return Err(SubmitError::MissingPriority);
        };
        let Some(data) = self.data else {
            return Err(SubmitError::MissingData);
        };
        let receiver = self.receiver.filter(|receiver| !receiver.trim().is_empty());

        let record = PacketRecord {
            id: self.generator.generate(),
            sender,
            receiver,
            packet_type,
            priority,
            bytes_size: data.bytes_size(),
            status: PacketStatus::Queued,
            queued_at: None,
            transmission_started_at: None,
            transmission_ended_at: None,
            acknowledged_at: None,
            latency: None,
            retry_count: 0,
            max_retries: priority.max_retries(),
        };

        Ok(Packet { record, data })
    }
}

impl<T> Packet<T>
where
    T: Data,
{
    pub fn builder(generator: &PacketIdGenerator) -> PacketBuilder<'_, T> {
        PacketBuilder::new(generator)
    }
}

impl<T> Packet<T> {
    pub fn id(&self) -> PacketId {
        self.record.id
    }

    pub fn priority(&self) -> Priority {
        self.record.priority
    }

    pub fn record(&self) -> &PacketRecord {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut PacketRecord {
        &mut self.record
    }

    /// consume the packet and get the inner `T`.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// consume the packet, keeping only its record.
    pub(crate) fn into_record(self) -> PacketRecord {
        self.record
    }
}

impl PacketRecord {
    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    pub fn packet_type(&self) -> &str {
        &self.packet_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn bytes_size(&self) -> u64 {
        self.bytes_size
    }

    pub fn status(&self) -> PacketStatus {
        self.status
    }

    /// When the packet first arrived in the queue. Retries keep it.
    pub fn queued_at(&self) -> Option<Timestamp> {
        self.queued_at
    }

    pub fn transmission_started_at(&self) -> Option<Timestamp> {
        self.transmission_started_at
    }

    pub fn transmission_ended_at(&self) -> Option<Timestamp> {
        self.transmission_ended_at
    }

    pub fn acknowledged_at(&self) -> Option<Timestamp> {
        self.acknowledged_at
    }

    /// Transmission duration plus link jitter, once transmitted.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Move to `next`, checking the lifecycle in debug builds.
    pub(crate) fn transition(&mut self, next: PacketStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid transition for packet {}: {} -> {}",
            self.id,
            self.status,
            next,
        );
        self.status = next;
    }
}

impl<T> fmt::Debug for Packet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(&format!("Packet<{}>", std::any::type_name::<T>()))
            .field("id", &self.record.id)
            .field("priority", &self.record.priority)
            .field("status", &self.record.status)
            .field("bytes_size", &self.record.bytes_size)
            .finish_non_exhaustive()
    }
}
