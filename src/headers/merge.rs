//! Merge policies.
//!
//! # Responsibilities
//! - Apply one directive to a response's headers according to its tag
//! - Read the current value right before every conditional check
//!
//! # Design Decisions
//! - The header store is a trait so any response type can be wrapped
//! - Case-insensitivity is the store's business, not the policy's

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::headers::directive::{Directive, MergeTag};

/// A mutable, multi-valued header mapping.
pub trait HeaderStore {
    /// First value of `name`, if present.
    fn header(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Replace every value of `name` with `value`. Returns `false` if the
    /// store cannot represent the pair.
    fn set_header(&mut self, name: &str, value: &str) -> bool;

    /// Append `value` to the values of `name`. Returns `false` if the store
    /// cannot represent the pair.
    fn add_header(&mut self, name: &str, value: &str) -> bool;
}

impl HeaderStore for HeaderMap {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    fn set_header(&mut self, name: &str, value: &str) -> bool {
        match to_http(name, value) {
            Some((name, value)) => {
                self.insert(name, value);
                true
            }
            None => false,
        }
    }

    fn add_header(&mut self, name: &str, value: &str) -> bool {
        match to_http(name, value) {
            Some((name, value)) => {
                self.append(name, value);
                true
            }
            None => false,
        }
    }
}

fn to_http(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let header_name = match HeaderName::from_bytes(name.as_bytes()) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(header = %name, error = %e, "Header name not representable, skipping");
            return None;
        }
    };
    match HeaderValue::from_str(value) {
        Ok(v) => Some((header_name, v)),
        Err(e) => {
            tracing::warn!(header = %name, error = %e, "Header value not representable, skipping");
            None
        }
    }
}

fn has_value<S: HeaderStore + ?Sized>(store: &S, name: &str) -> bool {
    store.header(name).is_some_and(|v| !v.is_empty())
}

/// Apply `directive` to `store`. Returns `false` when nothing was written,
/// either because a conditional tag skipped or the store rejected the pair.
pub fn apply<S: HeaderStore + ?Sized>(store: &mut S, directive: &Directive) -> bool {
    let (name, value) = (directive.name(), directive.value());
    match directive.tag() {
        MergeTag::Set => store.set_header(name, value),
        MergeTag::SetIfEmpty => !has_value(&*store, name) && store.set_header(name, value),
        MergeTag::Add => store.add_header(name, value),
        MergeTag::AddIfExist => has_value(&*store, name) && store.add_header(name, value),
    }
}
