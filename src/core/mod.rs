pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod manifest;
pub mod method;
pub mod path_pattern;
pub mod registry;
pub mod routing_table;

pub use compiler::{compile, compile_slice, compile_str};
pub use error::{DispatchError, ManifestError, ReconfigureError};
pub use gateway::GatewayService;
pub use manifest::RouteManifest;
pub use method::HttpMethod;
pub use path_pattern::{PathPattern, transform};
pub use registry::RouteRegistry;
pub use routing_table::{RouteMatch, RoutingTable};
