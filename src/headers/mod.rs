//! Response header directives.
//!
//! # Data Flow
//! ```text
//! [headers] config entries (name[:tag[:phase]] = template)
//!     → compiler.rs (split keys, resolve templates once)
//!         ↳ expression.rs ({{ENV|PROP|SYS:NAME}} placeholders)
//!         ↳ identity.rs (HOSTNAME / PID for SYS)
//!     → DirectiveSet (early list, late list; immutable)
//!     → filter.rs (per request: early → downstream → late)
//!         ↳ merge.rs (SET / SETIFEMPTY / ADD / ADDIFEXIST)
//! ```
//!
//! # Design Decisions
//! - Templates are resolved at load time, never per request
//! - Bad tag/phase tokens fall back to defaults instead of failing the load
//! - Late directives run on every exit path of the downstream call

pub mod compiler;
pub mod directive;
pub mod expression;
pub mod filter;
pub mod identity;
pub mod merge;

pub use compiler::DirectiveSet;
pub use directive::{Directive, MergeTag, Phase};
pub use expression::{Lookups, ProcessLookups};
pub use filter::{HeaderCarrier, HeaderFilter};
pub use identity::RuntimeIdentity;
pub use merge::HeaderStore;
