use crate::actor::{
    Stop,
    command::{Command, CommandSender},
};
use anyhow::{Context as _, Result, anyhow};
use prionet_core::{
    analytics::AnalyticsSnapshot,
    data::Data,
    link::LinkState,
    packet::{Packet, PacketId, PacketIdGenerator},
    priority::Priority,
    queue::QueueDepth,
    stats::SchedulerStats,
    time,
};
use std::{
    sync::{Arc, mpsc::TrySendError},
    time::Duration,
};
use thiserror::Error;

/// Submits packets to, and queries, a running [`SchedulerContext`].
///
/// Handles are cheap to clone and can be moved to other threads. All
/// of them stop working once the context is shut down.
///
/// [`SchedulerContext`]: crate::SchedulerContext
pub struct SchedulerHandle<T> {
    commands: CommandSender<T>,
    packet_id_generator: PacketIdGenerator,
    stop: Arc<Stop>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid packet")]
    Invalid(#[from] prionet_core::SubmitError),
    /// The scheduler thread is not keeping up with the submissions.
    #[error("Failed to submit packet: command queue is full.")]
    Full,
    #[error("Failed to submit packet: scheduler is stopped.")]
    Disconnected,
}

impl<T> SchedulerHandle<T>
where
    T: Data,
{
    pub(crate) fn new(
        commands: CommandSender<T>,
        packet_id_generator: PacketIdGenerator,
        stop: Arc<Stop>,
    ) -> Self {
        Self {
            commands,
            packet_id_generator,
            stop,
        }
    }

    /// Build a packet and submit it.
    ///
    /// `priority` is one of `CRITICAL`, `HIGH`, `MEDIUM` or `LOW`. The
    /// packet is queued at the start of the next tick, the returned
    /// identifier can be used to follow it in the store.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Invalid`] if the packet does not validate: empty
    /// `sender`, unknown `priority`... Nothing is sent to the scheduler in
    /// that case.
    pub fn submit(
        &self,
        sender: &str,
        packet_type: &str,
        priority: &str,
        data: T,
        receiver: Option<&str>,
    ) -> Result<PacketId, SubmitError> {
        let priority = priority
            .parse::<Priority>()
            .map_err(prionet_core::SubmitError::from)?;

        let mut builder = Packet::builder(&self.packet_id_generator)
            .sender(sender)
            .packet_type(packet_type)
            .priority(priority)
            .data(data);
        if let Some(receiver) = receiver {
            builder = builder.receiver(receiver);
        }

        self.submit_packet(builder.build()?)
    }

    /// Submit a packet built with [`Self::packet_id_generator`].
    pub fn submit_packet(&self, packet: Packet<T>) -> Result<PacketId, SubmitError> {
        if !self.is_running() {
            return Err(SubmitError::Disconnected);
        }

        let id = packet.id();
        self.commands
            .send_packet(packet)
            .map_err(|error| match error {
                TrySendError::Full(()) => SubmitError::Full,
                TrySendError::Disconnected(()) => SubmitError::Disconnected,
            })?;

        Ok(id)
    }

    pub fn packet_id_generator(&self) -> &PacketIdGenerator {
        &self.packet_id_generator
    }

    pub fn queue_depth(&self) -> Result<QueueDepth> {
        self.commands.query_queue_depth()
    }

    pub fn link_states(&self) -> Result<Vec<LinkState>> {
        self.commands.query_link_states()
    }

    /// The analytics snapshots of the last `window`, e.g. `"1h"`, `"6h"`
    /// or `"24h"`.
    pub fn analytics(&self, window: &str) -> Result<Vec<AnalyticsSnapshot>> {
        let lookback = window
            .parse::<time::Duration>()
            .with_context(|| format!("Invalid analytics window `{window}'"))?;

        self.analytics_since(lookback.into_duration())
    }

    pub fn analytics_since(&self, lookback: Duration) -> Result<Vec<AnalyticsSnapshot>> {
        self.commands.query_analytics(lookback)
    }

    pub fn stats(&self) -> Result<SchedulerStats> {
        self.commands.query_stats()
    }

    /// Bring the link up or down, applied at the start of the next tick.
    pub fn set_link_active(&self, active: bool) -> Result<()> {
        self.commands
            .send(Command::SetLinkActive(active))
            .map_err(|error| anyhow!("Failed to change the link state: {error}"))
    }

    /// Ask the scheduler to stop, without waiting for it.
    ///
    /// Use [`SchedulerContext::shutdown`] to wait for the threads to
    /// finish.
    ///
    /// [`SchedulerContext::shutdown`]: crate::SchedulerContext::shutdown
    pub fn shutdown(&self) {
        self.stop.raise();
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_raised()
    }
}

impl<T> Clone for SchedulerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            packet_id_generator: self.packet_id_generator.clone(),
            stop: Arc::clone(&self.stop),
        }
    }
}
