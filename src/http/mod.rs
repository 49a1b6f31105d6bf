//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing, timeouts)
//!     → middleware/response_headers.rs (early directives on a response shell)
//!     → upstream forward or local status handler
//!     → middleware/response_headers.rs (adopt response, late directives)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::SharedFilter;
pub use server::HttpServer;
