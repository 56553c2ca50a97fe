#![forbid(unsafe_code)]

//! Reference stream primitive.
//!
//! [`Feed<T>`] multicasts emitted values to its observers. Observers attach
//! via the [`StreamSource`] capability and detach through the returned
//! [`FeedGuard`], which also cancels on drop.
//!
//! # Invariants
//!
//! 1. Observers are notified in attach order.
//! 2. An observer attached during an emission does not see that emission.
//! 3. After `cancel`, an observer receives no further emissions — except the
//!    one being dispatched when cancellation happened mid-notification.
//!    Consumers guard against that with their own liveness check.
//!
//! # Failure Modes
//!
//! - **Observer panics**: the panic propagates to the emitter; observers
//!   later in the notification order are skipped for that emission.
//! - **Feed dropped with live guards**: guards become inert; cancelling one
//!   is a no-op.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::id::SourceId;
use crate::readiness::Value;
use crate::source::{CancelGuard, EmitFn, Source, StreamSource};

struct FeedCore {
    id: SourceId,
    next_token: RefCell<u64>,
    /// Attach-ordered observers, keyed by token for removal.
    observers: RefCell<Vec<(u64, Rc<RefCell<EmitFn>>)>>,
}

/// A multi-emission async source, driven manually by its producer.
pub struct Feed<T> {
    core: Rc<FeedCore>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Feed<T> {
    /// Create a feed with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(FeedCore {
                id: SourceId::fresh(),
                next_token: RefCell::new(1),
                observers: RefCell::new(Vec::new()),
            }),
            _marker: PhantomData,
        }
    }

    /// Emit a value to every currently attached observer, in attach order.
    pub fn emit(&self, value: T) {
        let value: Value = Rc::new(value);
        // Snapshot the observer list so attach/cancel from inside an
        // observer mutates the live list, not the one being iterated.
        let snapshot: Vec<Rc<RefCell<EmitFn>>> = self
            .core
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in snapshot {
            let mut observer = observer.borrow_mut();
            (*observer)(Rc::clone(&value));
        }
    }

    /// Number of currently attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.core.observers.borrow().len()
    }
}

impl<T: 'static> Default for Feed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Source for Feed<T> {
    fn id(&self) -> SourceId {
        self.core.id
    }

    fn as_stream(&self) -> Option<&dyn StreamSource> {
        Some(self)
    }
}

impl<T: 'static> StreamSource for Feed<T> {
    fn attach(&self, observer: EmitFn) -> Box<dyn CancelGuard> {
        let token = {
            let mut next = self.core.next_token.borrow_mut();
            let token = *next;
            *next += 1;
            token
        };
        self.core
            .observers
            .borrow_mut()
            .push((token, Rc::new(RefCell::new(observer))));
        Box::new(FeedGuard {
            core: Rc::downgrade(&self.core),
            token,
            cancelled: false,
        })
    }
}

/// RAII cancellation guard for one [`Feed`] subscription.
pub struct FeedGuard {
    core: Weak<FeedCore>,
    token: u64,
    cancelled: bool,
}

impl CancelGuard for FeedGuard {
    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(core) = self.core.upgrade() {
            core.observers
                .borrow_mut()
                .retain(|(token, _)| *token != self.token);
            trace!(source = core.id.get(), "feed observer detached");
        }
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}
