//! Response header middleware.
//!
//! Sets, conditionally sets, or appends HTTP response headers around a
//! downstream handler. Header values are templates over environment
//! variables, configured properties and the process identity, resolved
//! once when the configuration is loaded.

pub mod config;
pub mod headers;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::FilterConfig;
pub use headers::{HeaderFilter, MergeTag, Phase};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
