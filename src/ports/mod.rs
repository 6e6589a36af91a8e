pub mod http_client;
pub mod manifest_store;
