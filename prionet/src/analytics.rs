//! The analytics worker thread.
//!
//! Aggregating a whole window of history can take longer than a tick.
//! The scheduler thread only copies the records of the window into an
//! [`AnalyticsJob`] and hands it over to this worker. The snapshots come
//! back through a channel and the scheduler thread publishes them at the
//! start of a following tick.

use anyhow::{Context as _, Result, anyhow};
use prionet_core::analytics::{Aggregator, AnalyticsJob, AnalyticsSnapshot};
use std::{
    sync::mpsc::{
        Receiver, Sender, SyncSender, TryRecvError, TrySendError, channel, sync_channel,
    },
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

/// Jobs waiting for the worker. One job per aggregation interval, a
/// backlog this deep means the worker is far behind.
const JOB_CAPACITY: usize = 16;

const THREAD_NAME: &str = "prionet-analytics";

pub(crate) struct AnalyticsWorker {
    jobs: SyncSender<AnalyticsJob>,
    snapshots: Receiver<Vec<AnalyticsSnapshot>>,
    thread: JoinHandle<()>,
}

impl AnalyticsWorker {
    pub(crate) fn spawn(aggregator: Aggregator) -> Result<Self> {
        let (jobs, job_receiver) = sync_channel(JOB_CAPACITY);
        let (snapshot_sender, snapshots) = channel();

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || worker_run(aggregator, job_receiver, snapshot_sender))
            .context("Failed to spawn the analytics thread")?;

        Ok(Self {
            jobs,
            snapshots,
            thread,
        })
    }

    /// Hand over a job. The cycle is skipped if the worker is too far
    /// behind.
    pub(crate) fn submit(&self, job: AnalyticsJob) {
        match self.jobs.try_send(job) {
            Ok(()) => (),
            Err(TrySendError::Full(job)) => {
                warn!(window_end = %job.window_end, "Analytics worker is behind, cycle skipped");
            }
            Err(TrySendError::Disconnected(job)) => {
                warn!(window_end = %job.window_end, "Analytics worker is gone, cycle skipped");
            }
        }
    }

    /// The snapshots computed since the last call, in job order.
    pub(crate) fn collect(&self) -> Vec<Vec<AnalyticsSnapshot>> {
        let mut completed = Vec::new();
        loop {
            match self.snapshots.try_recv() {
                Ok(snapshots) => completed.push(snapshots),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        completed
    }

    /// Let the worker finish the jobs already handed over, then returns
    /// their snapshots.
    pub(crate) fn shutdown(self) -> Result<Vec<Vec<AnalyticsSnapshot>>> {
        let Self {
            jobs,
            snapshots,
            thread,
        } = self;

        // the worker stops once the job channel is disconnected
        drop(jobs);

        thread
            .join()
            .map_err(|join_error| anyhow!("Analytics thread panicked: {join_error:?}"))?;

        Ok(snapshots.try_iter().collect())
    }
}

fn worker_run(
    aggregator: Aggregator,
    jobs: Receiver<AnalyticsJob>,
    snapshots: Sender<Vec<AnalyticsSnapshot>>,
) {
    for job in jobs {
        let computed = aggregator.run(&job);
        debug!(
            window_end = %job.window_end,
            records = job.records.len(),
            "Analytics cycle computed"
        );

        if snapshots.send(computed).is_err() {
            // nobody left to publish the snapshots
            break;
        }
    }
}
