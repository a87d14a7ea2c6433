//! Field units flooding a congested link with traffic of every priority.
//!
//! Every unit submits a packet every `--every` milliseconds, one in
//! twenty of them `CRITICAL`. After `--time` seconds the analytics of
//! the run are printed per priority.
//!
//! ```sh
//! RUST_LOG=prionet=debug cargo run --example dispatch -- --units 4 --time 30
//! ```

use clap::Parser;
use prionet::{Config, SchedulerContext, SchedulerHandle, SubmitError};
use std::{
    thread::{self, sleep},
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    /// how long to run, in seconds
    #[arg(long, default_value = "30")]
    time: u64,

    /// interval between two packets of the same unit, in milliseconds
    #[arg(long, default_value = "250")]
    every: u64,

    #[arg(long, default_value = "3")]
    units: usize,

    /// TOML configuration, the defaults apply if omitted
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

const PRIORITIES: [(&str, &str); 4] = [
    ("LOW", "status"),
    ("MEDIUM", "telemetry"),
    ("HIGH", "vitals"),
    ("CRITICAL", "emergency"),
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cmd = Command::parse();
    let config = match &cmd.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    let context = SchedulerContext::<Vec<u8>>::new(config)?;
    let deadline = Instant::now() + Duration::from_secs(cmd.time);

    let units: Vec<_> = (0..cmd.units)
        .map(|index| {
            let unit = Unit {
                name: format!("ambulance-{index}"),
                handle: context.handle(),
                every: Duration::from_millis(cmd.every),
            };
            thread::spawn(move || unit.work(deadline))
        })
        .collect();

    for unit in units {
        let sent = unit.join().map_err(|_| anyhow::anyhow!("unit panicked"))?;
        println!("{sent} packets submitted by one unit");
    }

    let handle = context.handle();
    println!("queue: {}", handle.queue_depth()?);
    for snapshot in handle.analytics("1h")? {
        println!(
            "{end} {priority:>8}: {total:>5} total, {ok:>5} acknowledged, {lost:>4} dropped, \
             {latency:?} avg latency, {throughput:.1} kbps",
            end = snapshot.window_end,
            priority = snapshot.priority,
            total = snapshot.total,
            ok = snapshot.successful,
            lost = snapshot.dropped,
            latency = snapshot.avg_latency,
            throughput = snapshot.throughput_kbps,
        );
    }

    context.shutdown()
}

struct Unit {
    name: String,
    handle: SchedulerHandle<Vec<u8>>,
    every: Duration,
}

impl Unit {
    fn work(self, deadline: Instant) -> u64 {
        let mut sent = 0u64;

        while Instant::now() < deadline {
            let (priority, packet_type) = if sent % 20 == 19 {
                PRIORITIES[3]
            } else {
                PRIORITIES[(sent % 3) as usize]
            };

            match self
                .handle
                .submit(&self.name, packet_type, priority, vec![0; 1_200], None)
            {
                Ok(_) => sent += 1,
                Err(SubmitError::Full) => (),
                Err(error) => {
                    eprintln!("{}: {error}", self.name);
                    break;
                }
            }

            sleep(self.every);
        }

        sent
    }
}
