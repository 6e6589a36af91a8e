//! Core gateway orchestration service.
//!
//! The `GatewayService` owns the [`RouteRegistry`] and the persisted manifest
//! store. It provides:
//! * Lock-free routing table snapshots for the request path
//! * Startup loading of a previously persisted manifest
//! * All-or-nothing reconfiguration from an uploaded manifest
//!
//! Reconfiguration order is compile, persist, replace, all under one async
//! lock. A manifest that fails to compile never reaches the disk, and a
//! manifest that fails to persist never reaches the registry, so the file on
//! disk and the table in service cannot drift apart.
use std::sync::Arc;

use tokio::sync::Mutex as TokioMutex;

use crate::{
    core::{
        compiler::compile_slice, error::ReconfigureError, registry::RouteRegistry,
        routing_table::RoutingTable,
    },
    ports::manifest_store::ManifestStore,
};

pub struct GatewayService {
    registry: RouteRegistry,
    store: Arc<dyn ManifestStore>,
    reconfigure_lock: TokioMutex<()>,
}

impl GatewayService {
    /// Create a service with an empty routing table.
    pub fn new(store: Arc<dyn ManifestStore>) -> Self {
        Self {
            registry: RouteRegistry::empty(),
            store,
            reconfigure_lock: TokioMutex::new(()),
        }
    }

    /// The table to serve the current request with.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Load, compile and install the persisted manifest if one exists.
    ///
    /// Returns the installed table, or `None` when nothing was persisted.
    /// On error the registry keeps its current (empty) table.
    pub async fn load_persisted(&self) -> Result<Option<Arc<RoutingTable>>, ReconfigureError> {
        let _guard = self.reconfigure_lock.lock().await;

        let Some(bytes) = self.store.load().await? else {
            tracing::info!(
                location = %self.store.location(),
                "No persisted manifest found; serving only the upload endpoint"
            );
            return Ok(None);
        };

        let table = compile_slice(&bytes)?;
        self.registry.replace(table);
        let installed = self.registry.snapshot();

        tracing::info!(
            location = %self.store.location(),
            paths = installed.len(),
            routes = installed.route_count(),
            "Loaded persisted manifest"
        );
        Ok(Some(installed))
    }

    /// Replace the live routing table with one compiled from `manifest`.
    pub async fn reconfigure(&self, manifest: &[u8]) -> Result<Arc<RoutingTable>, ReconfigureError> {
        let _guard = self.reconfigure_lock.lock().await;

        let table = compile_slice(manifest).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected manifest; keeping current routes");
        })?;

        self.store.persist(manifest).await.inspect_err(|e| {
            tracing::error!(
                error = %e,
                location = %self.store.location(),
                "Failed to persist manifest; keeping current routes"
            );
        })?;

        self.registry.replace(table);
        Ok(self.registry.snapshot())
    }
}
