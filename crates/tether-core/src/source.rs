#![forbid(unsafe_code)]

//! Source capability traits and the classifier.
//!
//! Classification is structural, not nominal: a source is a one-shot if it
//! exposes the continuation-registration capability, a stream if it exposes
//! the subscription capability. The checks are independent — a type may
//! expose both — and the one-shot capability takes precedence.
//!
//! # Invariants
//!
//! 1. [`classify`] checks `as_one_shot()` before `as_stream()`.
//! 2. A [`OneShotSource`] continuation is invoked at most once.
//! 3. A [`StreamSource`] observer receives no emissions after its
//!    [`CancelGuard`] is cancelled, except possibly one already being
//!    dispatched when cancellation was requested. Consumers must tolerate
//!    that by checking their own liveness.

use crate::id::SourceId;
use crate::readiness::Value;

/// Continuation attached to a one-shot source. Invoked at most once.
pub type SettleFn = Box<dyn FnOnce(Value)>;

/// Observer attached to a stream source. Invoked once per emission.
pub type EmitFn = Box<dyn FnMut(Value)>;

/// Cancellation handle for an active stream subscription.
///
/// Cancelling twice is a no-op. Implementations are expected to also cancel
/// on drop so that discarding the guard cannot leak a subscription.
pub trait CancelGuard {
    /// Detach the observer. Subsequent emissions no longer reach it.
    fn cancel(&mut self);
}

/// An async source, described by its capabilities.
///
/// The default capability accessors return `None`; implementors opt into
/// each capability independently.
pub trait Source {
    /// Stable identity of this source object. Clones of one source must
    /// report the same id.
    fn id(&self) -> SourceId;

    /// The one-shot capability, if this source settles exactly once.
    fn as_one_shot(&self) -> Option<&dyn OneShotSource> {
        None
    }

    /// The stream capability, if this source emits repeatedly.
    fn as_stream(&self) -> Option<&dyn StreamSource> {
        None
    }
}

/// Capability: settles exactly once with a final value.
pub trait OneShotSource {
    /// Register a continuation for the settled value.
    ///
    /// If the source has already settled, the continuation is invoked
    /// synchronously with the stored value; a late attach still observes it.
    fn on_settle(&self, continuation: SettleFn);
}

/// Capability: emits zero or more values over time until cancelled.
pub trait StreamSource {
    /// Attach an observer; it runs once per emission until the returned
    /// guard is cancelled or dropped.
    ///
    /// A source may emit synchronously from inside `attach`. Callers that
    /// record subscriptions must create their bookkeeping entry *before*
    /// calling this.
    fn attach(&self, observer: EmitFn) -> Box<dyn CancelGuard>;
}

/// Which read path a source takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Settles exactly once.
    OneShot,
    /// Emits repeatedly until cancelled.
    Stream,
    /// Exposes neither capability.
    Invalid,
}

/// A classified source: the chosen capability, borrowed and ready to use.
pub enum Classified<'a> {
    /// The one-shot capability (takes precedence when both are present).
    OneShot(&'a dyn OneShotSource),
    /// The stream capability.
    Stream(&'a dyn StreamSource),
    /// Neither capability is present.
    Invalid,
}

impl Classified<'_> {
    /// The kind of this classification, without the capability borrow.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::OneShot(_) => SourceKind::OneShot,
            Self::Stream(_) => SourceKind::Stream,
            Self::Invalid => SourceKind::Invalid,
        }
    }
}

/// Classify a source by capability inspection.
///
/// The one-shot check runs first; a source exposing both capabilities is
/// read as a one-shot.
#[must_use]
pub fn classify(source: &dyn Source) -> Classified<'_> {
    if let Some(one_shot) = source.as_one_shot() {
        return Classified::OneShot(one_shot);
    }
    if let Some(stream) = source.as_stream() {
        return Classified::Stream(stream);
    }
    Classified::Invalid
}
