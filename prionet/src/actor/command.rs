use anyhow::{Context as _, Result, anyhow};
use prionet_core::{
    analytics::AnalyticsSnapshot, link::LinkState, packet::Packet, queue::QueueDepth,
    stats::SchedulerStats,
};
use std::{
    sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel},
    time::Duration,
};

/// What the handles ask of the scheduler thread.
///
/// Commands are applied in order, between two ticks.
pub(crate) enum Command<T> {
    Submit(Packet<T>),
    SetLinkActive(bool),
    QueueDepth(SyncSender<QueueDepth>),
    LinkStates(SyncSender<Vec<LinkState>>),
    /// snapshots within the given lookback of the current time
    Analytics(Duration, SyncSender<Vec<AnalyticsSnapshot>>),
    Stats(SyncSender<SchedulerStats>),
}

pub(crate) struct CommandSender<T>(SyncSender<Command<T>>);

pub(crate) struct CommandReceiver<T>(Receiver<Command<T>>);

pub(crate) fn command_channel<T>(capacity: usize) -> (CommandSender<T>, CommandReceiver<T>) {
    let (sender, receiver) = sync_channel(capacity);

    (CommandSender(sender), CommandReceiver(receiver))
}

impl<T> CommandSender<T> {
    pub(crate) fn send(&self, command: Command<T>) -> Result<(), TrySendError<Command<T>>> {
        self.0.try_send(command)
    }

    /// The packet is dropped if it could not be sent, only the reason
    /// is returned.
    pub(crate) fn send_packet(&self, packet: Packet<T>) -> Result<(), TrySendError<()>> {
        self.send(Command::Submit(packet)).map_err(|error| match error {
            TrySendError::Full(_) => TrySendError::Full(()),
            TrySendError::Disconnected(_) => TrySendError::Disconnected(()),
        })
    }

    /// Send a query and wait for the scheduler thread to answer it.
    ///
    /// The answer comes at the end of the current tick at the latest.
    fn query<R, F>(&self, what: &str, command: F) -> Result<R>
    where
        F: FnOnce(SyncSender<R>) -> Command<T>,
    {
        let (reply, answer) = sync_channel(1);

        self.send(command(reply))
            .map_err(|error| anyhow!("Failed to send {what} query: {error}"))?;

        answer
            .recv()
            .with_context(|| format!("Failed to receive {what} from the scheduler"))
    }

    pub(crate) fn query_queue_depth(&self) -> Result<QueueDepth> {
        self.query("queue depth", Command::QueueDepth)
    }

    pub(crate) fn query_link_states(&self) -> Result<Vec<LinkState>> {
        self.query("link states", Command::LinkStates)
    }

    pub(crate) fn query_analytics(&self, lookback: Duration) -> Result<Vec<AnalyticsSnapshot>> {
        self.query("analytics", |reply| Command::Analytics(lookback, reply))
    }

    pub(crate) fn query_stats(&self) -> Result<SchedulerStats> {
        self.query("stats", Command::Stats)
    }
}

impl<T> Clone for CommandSender<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> CommandReceiver<T> {
    pub(crate) fn try_recv(&mut self) -> Result<Command<T>, TryRecvError> {
        self.0.try_recv()
    }
}
