pub mod http_client;
pub mod http_handler;
pub mod manifest_store;
pub mod middleware;

/// Re-export commonly used types from adapters
pub use http_client::HttpClientAdapter;
pub use http_handler::{GatewayReply, HttpHandler, UPLOAD_PATH, build_router};
pub use manifest_store::FileManifestStore;
pub use middleware::request_timing_middleware;
