/*!
# Priority-aware transmission scheduler

Runs a [`prionet_core::scheduler::Scheduler`] on a dedicated thread,
paced on the wall clock, and exposes it through cloneable
[`SchedulerHandle`]s: field units submit packets from any thread while
dashboards query the queue depth, the link state and the analytics.

```no_run
use prionet::{Config, SchedulerContext};

# fn main() -> anyhow::Result<()> {
let config = Config::from_path("prionet.toml")?;
let context = SchedulerContext::<Vec<u8>>::new(config)?;
let handle = context.handle();

handle.submit("ambulance-12", "emergency", "CRITICAL", b"cardiac arrest".to_vec(), None)?;

for snapshot in handle.analytics("1h")? {
    println!("{}: {} packets, {:.1}% lost", snapshot.priority, snapshot.total, snapshot.loss_rate * 100.0);
}

context.shutdown()
# }
```
*/

mod actor;
mod analytics;
pub mod config;
mod handle;

// convenient re-export of `prionet_core` core objects
pub use prionet_core::{
    AnalyticsSnapshot, Bandwidth, Data, LinkConfig, LinkState, Packet, PacketId, PacketLoss,
    PacketRecord, PacketStatus, PacketStore, Priority, SchedulerConfig, StoreError, Timestamp,
    queue::QueueDepth,
    stats::SchedulerStats,
    store::{MemoryStore, NullStore},
};

pub use self::{
    actor::SchedulerContext,
    config::{Config, ConfigError},
    handle::{SchedulerHandle, SubmitError},
};
