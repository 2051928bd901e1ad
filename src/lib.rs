//! Caching HTTP/1.0 Forward Proxy Library

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use cache::ResponseCache;
pub use config::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
