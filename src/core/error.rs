use thiserror::Error;

use crate::{core::method::HttpMethod, ports::manifest_store::ManifestStoreError};

/// Errors produced while turning a manifest into a routing table.
///
/// Compilation is all-or-nothing: any of these aborts the whole manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ManifestError {
    /// The document cannot be parsed into the expected structure.
    #[error("Invalid manifest format: {0}")]
    InvalidManifestFormat(String),

    /// An operation has no explicit target and no resolvable tag.
    #[error("No upstream target for {method} {path}: {reason}")]
    MissingUpstreamTarget {
        path: String,
        method: HttpMethod,
        reason: String,
    },
}

/// Per-request failures while resolving an upstream. These never touch the
/// routing table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("No route matches path {path}")]
    RouteNotFound { path: String },

    #[error("No upstream configured for {method} {path}")]
    NoUpstreamForMethod { method: String, path: String },

    #[error("Invalid upstream url '{uri}': {reason}")]
    UpstreamUrlParse { uri: String, reason: String },
}

/// Failures of a reconfiguration attempt. The live routing table is left
/// untouched in every case.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReconfigureError {
    #[error(transparent)]
    Compile(#[from] ManifestError),

    #[error("Failed to persist manifest: {0}")]
    Persist(#[from] ManifestStoreError),
}
