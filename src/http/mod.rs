//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one detached task per connection)
//!     → handler.rs (per-connection state machine)
//!         → request.rs (request line, RequestContext)
//!         → uri.rs (host, port, path, cache key)
//!         → cache lookup; on hit reply and close
//!         → headers.rs (strip proxy-managed headers)
//!         → origin round trip, streamed back chunk by chunk
//!         → cache insert when within the object cap
//!     → response.rs (optional 400/501 on bad requests)
//! ```

pub mod error;
pub mod handler;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;
pub mod uri;

pub use error::ProxyError;
pub use handler::{ConnectionHandler, Outcome};
pub use server::ProxyServer;
