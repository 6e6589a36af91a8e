//! Manifest compiler.
//!
//! Validates a [`RouteManifest`] and produces a [`RoutingTable`]. Upstream
//! targets are resolved here, through tag fallback, so the dispatch path
//! never consults tags. Compilation is all-or-nothing; it has no side
//! effects and never touches the live registry.
use std::collections::{BTreeMap, HashMap};

use crate::core::{
    error::ManifestError,
    manifest::{ManifestTag, Operation, RouteManifest},
    method::HttpMethod,
    routing_table::{MethodTarget, OperationMetadata, RouteEntry, RoutingTable},
};

/// Compile a parsed manifest.
pub fn compile(manifest: &RouteManifest) -> Result<RoutingTable, ManifestError> {
    let tags = tag_targets(&manifest.tags);
    let mut entries = Vec::with_capacity(manifest.paths.len());

    for (listening_path, item) in &manifest.paths {
        let mut methods = BTreeMap::new();

        for (method, operation) in item.operations() {
            if !operation.is_defined() {
                tracing::debug!(
                    path = %listening_path,
                    method = %method,
                    "Skipping operation without summary"
                );
                continue;
            }

            let upstream_url = resolve_target(listening_path, method, operation, &tags)?;
            methods.insert(
                method,
                MethodTarget {
                    method,
                    upstream_url,
                    operation: OperationMetadata::from(operation),
                },
            );
        }

        if methods.is_empty() {
            tracing::debug!(path = %listening_path, "Listening path declares no routable operations");
            continue;
        }

        tracing::debug!(
            path = %listening_path,
            methods = ?methods.keys().map(HttpMethod::as_str).collect::<Vec<_>>(),
            "Mapping route"
        );
        entries.push(RouteEntry::new(listening_path, methods));
    }

    Ok(RoutingTable::new(entries))
}

/// Parse and compile manifest text in one step.
pub fn compile_str(input: &str) -> Result<RoutingTable, ManifestError> {
    compile(&RouteManifest::from_yaml(input)?)
}

/// Parse and compile raw manifest bytes in one step.
pub fn compile_slice(input: &[u8]) -> Result<RoutingTable, ManifestError> {
    compile(&RouteManifest::from_slice(input)?)
}

/// Tag name to default target. Later declarations of a name win.
fn tag_targets(tags: &[ManifestTag]) -> HashMap<&str, &str> {
    tags.iter()
        .map(|tag| (tag.name.as_str(), tag.target.trim()))
        .collect()
}

fn resolve_target(
    path: &str,
    method: HttpMethod,
    operation: &Operation,
    tags: &HashMap<&str, &str>,
) -> Result<String, ManifestError> {
    if let Some(target) = operation.explicit_target() {
        return Ok(target.to_string());
    }

    let missing = |reason: String| ManifestError::MissingUpstreamTarget {
        path: path.to_string(),
        method,
        reason,
    };

    let tag = operation
        .tag_ref()
        .ok_or_else(|| missing("neither x-target nor x-tag is set".to_string()))?;

    match tags.get(tag) {
        Some(target) if !target.is_empty() => Ok((*target).to_string()),
        Some(_) => Err(missing(format!("tag '{tag}' declares no x-target"))),
        None => Err(missing(format!("tag '{tag}' is not declared"))),
    }
}
