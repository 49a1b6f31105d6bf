//! Request wrapping.
//!
//! # Per-request flow
//! ```text
//! response not header-bearing → downstream only
//! otherwise:
//!     early directives (in order)
//!     → downstream
//!     → late directives (in order), on every exit path
//!     → downstream's outcome returned untouched
//! ```
//!
//! # Design Decisions
//! - Late directives are applied from a drop guard, so they also run while
//!   unwinding from a panic and when an async downstream is cancelled
//! - The directive lists are immutable; a filter is shared read-only

use futures_util::future::BoxFuture;

use axum::http::{response::Parts, HeaderMap, Response};

use crate::headers::compiler::{self, DirectiveSet};
use crate::headers::directive::Directive;
use crate::headers::expression::Lookups;
use crate::headers::merge::{self, HeaderStore};
use crate::observability::metrics;

/// Something that may expose a mutable header store.
pub trait HeaderCarrier {
    type Store: HeaderStore + ?Sized;

    /// The header store, or `None` if this response kind carries no headers.
    fn header_store(&mut self) -> Option<&mut Self::Store>;
}

impl HeaderCarrier for HeaderMap {
    type Store = HeaderMap;

    fn header_store(&mut self) -> Option<&mut HeaderMap> {
        Some(self)
    }
}

impl<B> HeaderCarrier for Response<B> {
    type Store = HeaderMap;

    fn header_store(&mut self) -> Option<&mut HeaderMap> {
        Some(self.headers_mut())
    }
}

impl HeaderCarrier for Parts {
    type Store = HeaderMap;

    fn header_store(&mut self) -> Option<&mut HeaderMap> {
        Some(&mut self.headers)
    }
}

/// Applies early and late header directives around a downstream call.
#[derive(Debug, Clone, Default)]
pub struct HeaderFilter {
    directives: DirectiveSet,
}

impl HeaderFilter {
    pub fn new(directives: DirectiveSet) -> Self {
        Self { directives }
    }

    /// Compile configuration entries and build a filter over them.
    pub fn from_entries<I, K, V, L>(entries: I, lookups: &L) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        L: Lookups + ?Sized,
    {
        Self::new(compiler::compile(entries, lookups))
    }

    pub fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    /// Apply every early directive to `ctx`.
    pub fn apply_early<C: HeaderCarrier + ?Sized>(&self, ctx: &mut C) {
        if let Some(store) = ctx.header_store() {
            apply_all(store, self.directives.early());
        }
    }

    /// Apply every late directive to `ctx`.
    pub fn apply_late<C: HeaderCarrier + ?Sized>(&self, ctx: &mut C) {
        if let Some(store) = ctx.header_store() {
            apply_all(store, self.directives.late());
        }
    }

    /// Run `downstream` with early directives applied before it and late
    /// directives applied after it, however it exits. Its return value
    /// (including an `Err`) is passed back unchanged, and a panic keeps
    /// unwinding once late directives are in place.
    pub fn process<C, F, T>(&self, ctx: &mut C, downstream: F) -> T
    where
        C: HeaderCarrier,
        F: FnOnce(&mut C) -> T,
    {
        if ctx.header_store().is_none() {
            return downstream(ctx);
        }

        self.apply_early(ctx);
        let mut guard = LateGuard { filter: self, ctx };
        let outcome = downstream(&mut *guard.ctx);
        drop(guard);
        outcome
    }

    /// Async counterpart of [`process`](Self::process). Late directives
    /// are also applied if the returned future is dropped before completion.
    pub async fn process_async<C, F, T>(&self, ctx: &mut C, downstream: F) -> T
    where
        C: HeaderCarrier + Send,
        F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, T> + Send,
    {
        if ctx.header_store().is_none() {
            return downstream(ctx).await;
        }

        self.apply_early(ctx);
        let mut guard = LateGuard { filter: self, ctx };
        let outcome = downstream(&mut *guard.ctx).await;
        drop(guard);
        outcome
    }
}

fn apply_all<S: HeaderStore + ?Sized>(store: &mut S, directives: &[Directive]) {
    for directive in directives {
        let applied = merge::apply(store, directive);
        tracing::trace!(
            header = %directive.name(),
            tag = %directive.tag(),
            phase = %directive.phase(),
            applied,
            "Header directive processed"
        );
        metrics::record_directive(directive.tag(), directive.phase(), applied);
    }
}

/// Applies late directives when dropped.
struct LateGuard<'a, C: HeaderCarrier> {
    filter: &'a HeaderFilter,
    ctx: &'a mut C,
}

impl<C: HeaderCarrier> Drop for LateGuard<'_, C> {
    fn drop(&mut self) {
        self.filter.apply_late(&mut *self.ctx);
    }
}
