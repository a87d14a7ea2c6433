//! The durable record of truth the scheduler reports to.
//!
//! The scheduler writes every packet admission, every status transition,
//! every link update and every analytics snapshot to a [`PacketStore`].
//! It never reads anything back: scheduling state lives in memory. A
//! failed write is logged and otherwise ignored.

use crate::{analytics::AnalyticsSnapshot, link::LinkState, packet::PacketRecord};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Error reported by a [`PacketStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
    #[error("Store rejected the write: {0}")]
    Rejected(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Downstream persistence collaborator.
///
/// Every method is fire-and-forget from the scheduler's point of view:
/// errors are logged, never retried and never affect scheduling.
pub trait PacketStore: Send + 'static {
    /// A packet was admitted into the queue.
    fn insert_packet(&mut self, record: &PacketRecord) -> Result<(), StoreError>;

    /// A packet moved to a new status. `record` is its state right after
    /// the transition.
    fn update_packet_status(&mut self, record: &PacketRecord) -> Result<(), StoreError>;

    fn upsert_link_state(&mut self, state: &LinkState) -> Result<(), StoreError>;

    fn insert_analytics_snapshot(&mut self, snapshot: &AnalyticsSnapshot)
    -> Result<(), StoreError>;
}

/// A store that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl PacketStore for NullStore {
    fn insert_packet(&mut self, _: &PacketRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn update_packet_status(&mut self, _: &PacketRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn upsert_link_state(&mut self, _: &LinkState) -> Result<(), StoreError> {
        Ok(())
    }

    fn insert_analytics_snapshot(&mut self, _: &AnalyticsSnapshot) -> Result<(), StoreError> {
        Ok(())
    }
}

/// An in-memory store.
///
/// Clones share the same content so a test (or a dashboard) can keep a
/// handle on what the scheduler wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<Mutex<MemoryStoreContent>>);

/// Everything written to a [`MemoryStore`], in write order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreContent {
    pub packets: Vec<PacketRecord>,
    pub status_updates: Vec<PacketRecord>,
    pub link_states: Vec<LinkState>,
    pub snapshots: Vec<AnalyticsSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything written so far.
    pub fn content(&self) -> MemoryStoreContent {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn with<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MemoryStoreContent),
    {
        let mut content = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut content);
        Ok(())
    }
}

impl PacketStore for MemoryStore {
    fn insert_packet(&mut self, record: &PacketRecord) -> Result<(), StoreError> {
        self.with(|content| content.packets.push(record.clone()))
    }

    fn update_packet_status(&mut self, record: &PacketRecord) -> Result<(), StoreError> {
        self.with(|content| content.status_updates.push(record.clone()))
    }

    fn upsert_link_state(&mut self, state: &LinkState) -> Result<(), StoreError> {
        self.with(|content| {
            match content.link_states.iter_mut().find(|s| s.id == state.id) {
                Some(existing) => *existing = state.clone(),
                None => content.link_states.push(state.clone()),
            }
        })
    }

    fn insert_analytics_snapshot(
        &mut self,
        snapshot: &AnalyticsSnapshot,
    ) -> Result<(), StoreError> {
        self.with(|content| content.snapshots.push(snapshot.clone()))
    }
}

impl<S> PacketStore for Box<S>
where
    S: PacketStore + ?Sized,
{
    fn insert_packet(&mut self, record: &PacketRecord) -> Result<(), StoreError> {
        (**self).insert_packet(record)
    }

    fn update_packet_status(&mut self, record: &PacketRecord) -> Result<(), StoreError> {
        (**self).update_packet_status(record)
    }

    fn upsert_link_state(&mut self, state: &LinkState) -> Result<(), StoreError> {
        (**self).upsert_link_state(state)
    }

    fn insert_analytics_snapshot(
        &mut self,
        snapshot: &AnalyticsSnapshot,
    ) -> Result<(), StoreError> {
        (**self).insert_analytics_snapshot(snapshot)
    }
}
