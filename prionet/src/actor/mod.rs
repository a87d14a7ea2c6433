pub(crate) mod command;
mod stop;

pub(crate) use self::stop::Stop;

use self::command::{Command, CommandReceiver, command_channel};
use crate::{Config, SchedulerHandle, analytics::AnalyticsWorker};
use anyhow::{Context as _, Result, bail};
use prionet_core::{
    data::Data,
    scheduler::{AnalyticsMode, Scheduler},
    store::{NullStore, PacketStore},
};
use std::{
    sync::{Arc, mpsc::TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

const THREAD_NAME: &str = "prionet-scheduler";

/// Runs a [`Scheduler`] on its own thread, in real time.
///
/// Every tick interval of wall-clock time the scheduler thread applies
/// the commands received from the [`SchedulerHandle`]s and advances the
/// scheduler by one tick. The analytics run on a second thread so that a
/// long aggregation never delays a tick.
///
/// ```no_run
/// use prionet::{Config, SchedulerContext};
///
/// # fn main() -> anyhow::Result<()> {
/// let context = SchedulerContext::<Vec<u8>>::new(Config::default())?;
/// let handle = context.handle();
///
/// let id = handle.submit("ambulance-12", "vitals", "HIGH", vec![0; 512], None)?;
/// println!("{id} queued, {}", handle.queue_depth()?);
///
/// context.shutdown()
/// # }
/// ```
pub struct SchedulerContext<T> {
    handle: SchedulerHandle<T>,

    stop: Arc<Stop>,

    thread: JoinHandle<Result<()>>,
}

struct Actor<T> {
    scheduler: Scheduler<T>,

    commands: CommandReceiver<T>,

    analytics: AnalyticsWorker,

    stop: Arc<Stop>,
}

impl<T> SchedulerContext<T>
where
    T: Data,
{
    /// Start a scheduler that does not persist anything.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_store(config, NullStore)
    }

    /// Start a scheduler reporting to `store`.
    ///
    /// The store is moved to the scheduler thread, it is the only one
    /// writing to it.
    pub fn with_store<S>(config: Config, store: S) -> Result<Self>
    where
        S: PacketStore,
    {
        let Config {
            scheduler,
            link,
            command_capacity,
        } = config;
        let scheduler_config = scheduler.set_analytics_mode(AnalyticsMode::Offloaded);

        let scheduler = Scheduler::new(scheduler_config, link, store)
            .context("Invalid scheduler configuration")?;
        let analytics = AnalyticsWorker::spawn(scheduler.aggregator())?;

        let stop = Arc::new(Stop::new());
        let (commands, receiver) = command_channel(command_capacity);
        let handle = SchedulerHandle::new(
            commands,
            scheduler.packet_id_generator().clone(),
            Arc::clone(&stop),
        );

        let actor = Actor {
            scheduler,
            commands: receiver,
            analytics,
            stop: Arc::clone(&stop),
        };

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || actor_run(actor))
            .context("Failed to spawn the scheduler thread")?;

        Ok(Self {
            handle,
            stop,
            thread,
        })
    }

    /// A handle to submit packets and query the scheduler with.
    pub fn handle(&self) -> SchedulerHandle<T> {
        self.handle.clone()
    }

    /// Stop the scheduler and wait for its threads to finish.
    ///
    /// Packets still queued or in flight are abandoned where they are.
    pub fn shutdown(self) -> Result<()> {
        self.stop.raise();

        match self.thread.join() {
            Err(join_error) => {
                bail!("Scheduler failed to clean shutdown: {join_error:?}")
            }
            Ok(Err(error)) => Err(error).context("Scheduler failed with error"),
            Ok(Ok(())) => Ok(()),
        }
    }
}

impl<T> Actor<T>
where
    T: Data,
{
    fn stopped(&self) -> bool {
        self.stop.is_raised()
    }

    fn inbound(&mut self, command: Command<T>) {
        // a reply fails only if the querying handle gave up waiting,
        // there is nobody left to tell
        match command {
            Command::Submit(packet) => {
                if let Err(error) = self.scheduler.submit(packet) {
                    warn!(%error, "Packet refused");
                }
            }
            Command::SetLinkActive(active) => self.scheduler.set_link_active(active),
            Command::QueueDepth(reply) => {
                let _ = reply.send(self.scheduler.queue_depth());
            }
            Command::LinkStates(reply) => {
                let _ = reply.send(self.scheduler.link_states());
            }
            Command::Analytics(lookback, reply) => {
                let _ = reply.send(self.scheduler.analytics(lookback));
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.scheduler.stats());
            }
        }
    }

    fn inbounds(&mut self) {
        loop {
            match self.commands.try_recv() {
                Err(TryRecvError::Disconnected) => {
                    // every handle is gone, nothing can be submitted
                    // anymore
                    self.stop.raise();

                    break;
                }
                Err(TryRecvError::Empty) => break,
                Ok(command) => self.inbound(command),
            }
        }
    }

    fn step(&mut self, duration: Duration) {
        self.inbounds();

        for snapshots in self.analytics.collect() {
            self.scheduler.publish_snapshots(snapshots);
        }

        self.scheduler.advance_with(duration, |record| {
            debug!(
                packet = %record.id(),
                priority = %record.priority(),
                status = %record.status(),
                retries = record.retry_count(),
                latency = ?record.latency(),
                "Packet done"
            );
        });

        for job in self.scheduler.take_analytics_jobs() {
            self.analytics.submit(job);
        }
    }

    /// Publish the snapshots of the cycles already handed over to the
    /// worker so that the store sees them.
    fn finish(self) -> Result<()> {
        let Self {
            mut scheduler,
            analytics,
            ..
        } = self;

        for snapshots in analytics.shutdown()? {
            scheduler.publish_snapshots(snapshots);
        }

        info!(round = %scheduler.round(), now = %scheduler.now(), "Scheduler stopped");
        Ok(())
    }
}

fn actor_run<T>(mut actor: Actor<T>) -> Result<()>
where
    T: Data,
{
    let target = actor.scheduler.config().tick_interval;
    info!(tick_interval = ?target, "Scheduler started");

    let mut instant = Instant::now();

    // how much longer than `target` the last step took. It is added to
    // the next step so that the simulated time keeps up with the wall
    // clock.
    let mut adjustment = Duration::ZERO;

    while !actor.stopped() {
        actor.step(target + adjustment);

        let elapsed = instant.elapsed();

        let sleep_duration = target.saturating_sub(elapsed);
        adjustment = elapsed.saturating_sub(target);

        thread::sleep(sleep_duration);

        instant = Instant::now();
    }

    actor.finish()
}

