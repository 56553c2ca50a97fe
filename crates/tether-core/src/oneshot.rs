#![forbid(unsafe_code)]

//! Reference one-shot primitive.
//!
//! [`Deferred<T>`] settles exactly once with a final value. Continuations
//! attached before settlement are queued and run in attach order when
//! [`Deferred::settle`] is called; continuations attached after settlement
//! run synchronously with the stored value.
//!
//! # Invariants
//!
//! 1. `settle` takes effect at most once; later calls are ignored.
//! 2. Every continuation runs at most once.
//! 3. Clones share state and identity: settling through one clone is
//!    observed by all.
//!
//! # Failure Modes
//!
//! - **Continuation panics**: the source stays settled; remaining queued
//!   continuations for the same `settle` call are not run.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::trace;

use crate::id::SourceId;
use crate::readiness::Value;
use crate::source::{OneShotSource, SettleFn, Source};

enum DeferredState {
    /// Not yet settled; continuations queued in attach order.
    Waiting(Vec<SettleFn>),
    /// Settled; the erased final value.
    Settled(Value),
}

/// A one-shot async source, settled manually by its producer.
pub struct Deferred<T> {
    id: SourceId,
    state: Rc<RefCell<DeferredState>>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Rc::clone(&self.state),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Deferred<T> {
    /// Create an unsettled deferred value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SourceId::fresh(),
            state: Rc::new(RefCell::new(DeferredState::Waiting(Vec::new()))),
            _marker: PhantomData,
        }
    }

    /// Settle with the final value, running queued continuations in attach
    /// order. A second settle is ignored.
    pub fn settle(&self, value: T) {
        let value: Value = Rc::new(value);
        let waiting = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                DeferredState::Settled(_) => {
                    trace!(source = self.id.get(), "deferred already settled, ignoring");
                    return;
                }
                DeferredState::Waiting(continuations) => {
                    let continuations = std::mem::take(continuations);
                    *state = DeferredState::Settled(Rc::clone(&value));
                    continuations
                }
            }
        };
        // State borrow is released before continuations run: a continuation
        // may attach further continuations or clone the handle.
        for continuation in waiting {
            continuation(Rc::clone(&value));
        }
    }

    /// Whether the final value has been produced.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(&*self.state.borrow(), DeferredState::Settled(_))
    }
}

impl<T: 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Source for Deferred<T> {
    fn id(&self) -> SourceId {
        self.id
    }

    fn as_one_shot(&self) -> Option<&dyn OneShotSource> {
        Some(self)
    }
}

impl<T: 'static> OneShotSource for Deferred<T> {
    fn on_settle(&self, continuation: SettleFn) {
        let settled = match &*self.state.borrow() {
            DeferredState::Settled(value) => Some(Rc::clone(value)),
            DeferredState::Waiting(_) => None,
        };
        match settled {
            // Late attach: run synchronously with the stored value, outside
            // the state borrow.
            Some(value) => continuation(value),
            None => {
                if let DeferredState::Waiting(continuations) = &mut *self.state.borrow_mut() {
                    continuations.push(continuation);
                }
            }
        }
    }
}
