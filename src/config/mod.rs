//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FilterConfig (validated, immutable)
//!     → headers compiler (directive lists)
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server recompiles directives and swaps the filter atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - `[headers]` keeps document order

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{FilterConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig, UpstreamConfig};
