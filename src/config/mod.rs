//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → CLI port override applied in main
//!     → shared by value/Arc with the server and cache
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the cache budget is never resized at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{CacheConfig, ForwardingConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig};
pub use validation::{validate_config, ValidationError};
