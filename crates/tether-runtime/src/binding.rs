#![forbid(unsafe_code)]

//! Per-component binding state.
//!
//! One [`ComponentBinding`] exists per host component that has read at least
//! one async source, and only while it has outstanding sources. The binding
//! caches the last observed value per source, owns the stream cancellation
//! guards, tracks which streams the render pass in progress actually read,
//! and keeps the pre-interception hook snapshot needed to uninstall.
//!
//! # Invariants
//!
//! 1. `used_streams` reflects only the render pass in progress: cleared by
//!    [`ComponentBinding::begin_pass`], rebuilt by
//!    [`ComponentBinding::mark_used`] in read order, without duplicates.
//! 2. Every entry in `streams` holds a live guard, except during the
//!    placeholder window between entry creation and subscription.
//! 3. A one-shot entry transitions `None -> Some(value)` at most once and
//!    never back.

use std::collections::HashMap;

use tether_core::{CancelGuard, SourceId, Value};

use crate::host::{ConnectFn, DisconnectFn, RenderFn};

/// Hook snapshot captured when the interceptor installs, restored verbatim
/// (absence included) when it uninstalls.
pub(crate) struct OriginalHooks<R> {
    pub(crate) connect: Option<ConnectFn>,
    pub(crate) disconnect: Option<DisconnectFn>,
    pub(crate) render: Option<RenderFn<R>>,
}

/// Cache entry for one subscribed stream.
pub struct StreamSlot {
    /// Subscription guard; `None` only during the placeholder window while
    /// the subscription is being established.
    pub(crate) guard: Option<Box<dyn CancelGuard>>,
    /// Most recent emission, if any.
    pub(crate) last: Option<Value>,
}

impl StreamSlot {
    pub(crate) fn placeholder() -> Self {
        Self {
            guard: None,
            last: None,
        }
    }

    /// Cancel the subscription, if one was established.
    pub(crate) fn cancel(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            guard.cancel();
        }
    }
}

/// Async-binding state of one host component.
pub struct ComponentBinding<R> {
    /// One-shot cache: `None` until the source settles.
    pub(crate) one_shots: HashMap<SourceId, Option<Value>>,
    /// Stream cache and subscription guards.
    pub(crate) streams: HashMap<SourceId, StreamSlot>,
    /// Streams read by the render pass in progress, in read order.
    pub(crate) used_streams: Vec<SourceId>,
    /// Pre-interception hooks, captured exactly once at install time.
    pub(crate) original_hooks: OriginalHooks<R>,
}

impl<R> ComponentBinding<R> {
    pub(crate) fn new(original_hooks: OriginalHooks<R>) -> Self {
        Self {
            one_shots: HashMap::new(),
            streams: HashMap::new(),
            used_streams: Vec::new(),
            original_hooks,
        }
    }

    /// Forget the previous pass's stream usage.
    pub(crate) fn begin_pass(&mut self) {
        self.used_streams.clear();
    }

    /// Record a stream as read by the pass in progress.
    pub(crate) fn mark_used(&mut self, source: SourceId) {
        if !self.used_streams.contains(&source) {
            self.used_streams.push(source);
        }
    }

    /// Remove every stream the pass in progress did not read, handing the
    /// slots back so the caller can cancel them outside any store borrow.
    pub(crate) fn take_unused(&mut self) -> Vec<(SourceId, StreamSlot)> {
        let unused: Vec<SourceId> = self
            .streams
            .keys()
            .filter(|source| !self.used_streams.contains(source))
            .copied()
            .collect();
        unused
            .into_iter()
            .filter_map(|source| self.streams.remove(&source).map(|slot| (source, slot)))
            .collect()
    }

    /// Whether the component has no outstanding async work.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.one_shots.is_empty() && self.streams.is_empty()
    }

    /// Number of tracked one-shot sources.
    #[must_use]
    pub fn one_shot_count(&self) -> usize {
        self.one_shots.len()
    }

    /// Number of live stream subscriptions.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}
