//! # prionet core
//!
//! A deterministic, priority-aware transmission scheduler for a single
//! shared and lossy radio link.
//!
//! Packets are submitted with a [`Priority`]. The [`Scheduler`] decides
//! which packet goes over the air next, preempts lower priority
//! transmissions when a `CRITICAL` packet shows up, simulates the
//! outcome of every attempt (duration, loss, acknowledgment) and retries
//! lost packets within a per-priority budget. Every admission and status
//! transition is reported to a [`PacketStore`], and per-priority
//! [`AnalyticsSnapshot`]s are computed periodically for the dashboards.
//!
//! Nothing runs on its own: the caller drives the simulated time with
//! [`Scheduler::advance_with`] (or [`Scheduler::tick`]). The `prionet`
//! crate wraps the scheduler in a real-time actor thread.
//!
//! ```
//! use prionet_core::{
//!     link::{LinkConfig, LossModel},
//!     measure::PacketLoss,
//!     packet::{Packet, PacketStatus},
//!     scheduler::{Scheduler, SchedulerConfig},
//!     store::MemoryStore,
//! };
//!
//! let config = SchedulerConfig::default().set_loss_model(LossModel::Fixed(PacketLoss::None));
//! let link = LinkConfig {
//!     capacity: "512kbps".parse().unwrap(),
//!     ..LinkConfig::default()
//! };
//! let mut scheduler: Scheduler<Vec<u8>> =
//!     Scheduler::new(config, link, MemoryStore::new()).unwrap();
//!
//! let packet = Packet::builder(scheduler.packet_id_generator())
//!     .sender("ambulance-7")
//!     .receiver("hospital-2")
//!     .packet_type("trip_start")
//!     .priority("high".parse().unwrap())
//!     .data(vec![0; 256])
//!     .build()
//!     .unwrap();
//! let id = scheduler.submit(packet).unwrap();
//!
//! let mut done = Vec::new();
//! while done.is_empty() {
//!     scheduler.advance_with(std::time::Duration::from_millis(100), |record| {
//!         done.push(record.clone())
//!     });
//! }
//! assert_eq!(done[0].id(), id);
//! assert_eq!(done[0].status(), PacketStatus::Acknowledged);
//! ```
//!
//! [`Priority`]: crate::priority::Priority
//! [`Scheduler`]: crate::scheduler::Scheduler
//! [`Scheduler::advance_with`]: crate::scheduler::Scheduler::advance_with
//! [`Scheduler::tick`]: crate::scheduler::Scheduler::tick
//! [`PacketStore`]: crate::store::PacketStore
//! [`AnalyticsSnapshot`]: crate::analytics::AnalyticsSnapshot

pub mod analytics;
pub mod data;
pub mod defaults;
pub mod history;
pub mod link;
pub mod measure;
pub mod packet;
pub mod priority;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod time;

pub use self::{
    analytics::AnalyticsSnapshot,
    data::Data,
    link::{LinkConfig, LinkState},
    measure::{Bandwidth, PacketLoss},
    packet::{Packet, PacketId, PacketRecord, PacketStatus, SubmitError},
    priority::Priority,
    scheduler::{Scheduler, SchedulerConfig},
    store::{PacketStore, StoreError},
    time::Timestamp,
};
