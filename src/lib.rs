//! Gantry - a manifest-driven API gateway.
//!
//! Gantry routes inbound HTTP requests to upstream services according to a
//! declarative route manifest (an OpenAPI-shaped YAML document in which every
//! operation names its upstream with `x-target`, or a tag whose `x-target`
//! applies). The manifest can be replaced at runtime by uploading a new one to
//! `POST /gw-upload`; the new routing table becomes visible atomically, and a
//! manifest that fails to compile never replaces the live routes.
//!
//! # Features
//! - Path patterns with named parameters (`/users/{id}`) and greedy trailing
//!   captures (`/github/{account+}`)
//! - Parameter substitution into upstream targets, greedy suffix forwarding
//! - All-or-nothing manifest compilation with tag-based target resolution
//! - Lock-free routing table snapshots with serialized hot swaps
//! - Atomic on-disk persistence of the accepted manifest, reloaded at startup
//! - Structured tracing via `tracing` & graceful shutdown
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use gantry::{FileManifestStore, GatewayService};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let store = Arc::new(FileManifestStore::new("config/app.yaml"));
//! let gateway = Arc::new(GatewayService::new(store));
//! gateway.load_persisted().await?;
//! // Wire into the router from `gantry::adapters::build_router` (see binary crate)
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! manifest compilation, routing and dispatch resolution inside `core`, free of I/O.
//!
//! # Error Handling
//! Domain operations return `thiserror` enums (`ManifestError`, `DispatchError`,
//! `ReconfigureError`). Application plumbing returns `eyre::Result<T>` with context
//! attached through `WrapErr`.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{FileManifestStore, HttpClientAdapter, HttpHandler, build_router},
    core::{GatewayService, RouteRegistry, RoutingTable},
    ports::{http_client::HttpClient, manifest_store::ManifestStore},
    utils::GracefulShutdown,
};
