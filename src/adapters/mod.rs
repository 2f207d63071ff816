// Adapters layer: concrete implementations of the domain ports (HTTP API, local files).

pub mod http;
pub mod storage;
