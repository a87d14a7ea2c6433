//! Watch the scheduler while the link goes down and comes back up.
//!
//! ```sh
//! cargo run --example monitoring -- --outage 5
//! ```

use clap::Parser;
use prionet::{Config, SchedulerContext};
use std::{thread::sleep, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    /// how long the link stays down, in seconds
    #[arg(long, default_value = "5")]
    outage: u64,

    /// how often to print the stats, in milliseconds
    #[arg(long, default_value = "500")]
    every: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cmd = Command::parse();
    let every = Duration::from_millis(cmd.every);
    let rounds = (cmd.outage * 1_000 / cmd.every.max(1)).max(1);

    let context = SchedulerContext::<&'static str>::new(Config::default())?;
    let handle = context.handle();

    for priority in ["LOW", "MEDIUM", "HIGH", "LOW", "MEDIUM"] {
        handle.submit("tower-north", "report", priority, "shift report", None)?;
    }

    println!("-- link up");
    report(&context, rounds.min(4), every)?;

    handle.set_link_active(false)?;
    handle.submit("ambulance-7", "emergency", "CRITICAL", "multi-vehicle collision", None)?;
    println!("-- link down");
    report(&context, rounds, every)?;

    handle.set_link_active(true)?;
    println!("-- link up");
    report(&context, rounds, every)?;

    context.shutdown()
}

fn report(
    context: &SchedulerContext<&'static str>,
    rounds: u64,
    every: Duration,
) -> anyhow::Result<()> {
    let handle = context.handle();

    for _ in 0..rounds {
        sleep(every);

        let stats = handle.stats()?;
        let in_flight: Vec<_> = stats
            .in_flight
            .iter()
            .map(|t| format!("{}({}, retries {})", t.id, t.priority, t.retry_count))
            .collect();
        println!(
            "[{now}] queue {queue} | in flight [{in_flight}] | awaiting ack {acks} | \
             link {active} {utilization:.1}% loss {loss}",
            now = stats.now,
            queue = stats.queue_depth,
            in_flight = in_flight.join(", "),
            acks = stats.awaiting_ack,
            active = if stats.link.active { "up" } else { "down" },
            utilization = stats.link.utilization,
            loss = stats.link.packet_loss,
        );
    }

    Ok(())
}
