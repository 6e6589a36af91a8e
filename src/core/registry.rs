//! Holder of the routing table currently being served.
//!
//! Readers take an `Arc` snapshot through an `ArcSwap` and never block.
//! Writers are serialized by a mutex so revisions are assigned in the same
//! order tables become visible. A snapshot stays valid for as long as the
//! caller holds it, even after a replacement.
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use arc_swap::ArcSwap;

use crate::core::routing_table::RoutingTable;

pub struct RouteRegistry {
    active: ArcSwap<RoutingTable>,
    write_lock: Mutex<()>,
    revision: AtomicU64,
}

impl RouteRegistry {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            active: ArcSwap::from_pointee(table.with_revision(1)),
            write_lock: Mutex::new(()),
            revision: AtomicU64::new(1),
        }
    }

    pub fn empty() -> Self {
        Self::new(RoutingTable::empty())
    }

    /// The complete table currently in service.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.active.load_full()
    }

    /// Install `table` for all subsequent snapshots, returning the table it
    /// replaced. Holders of earlier snapshots keep the old table.
    pub fn replace(&self, table: RoutingTable) -> Arc<RoutingTable> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let revision = self.revision.load(Ordering::Acquire) + 1;
        let table = Arc::new(table.with_revision(revision));
        let routes = table.route_count();
        let previous = self.active.swap(table);
        self.revision.store(revision, Ordering::Release);

        tracing::info!(
            revision,
            routes,
            previous_routes = previous.route_count(),
            "Routing table replaced"
        );
        previous
    }

    /// Revision of the most recently installed table.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
