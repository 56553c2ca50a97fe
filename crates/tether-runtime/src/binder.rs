#![forbid(unsafe_code)]

//! The binding engine: registration store, value cache, and dispatch.
//!
//! # Design
//!
//! [`Binder<R>`] wraps shared, reference-counted state in the manner of the
//! single-threaded reactive primitives it serves: `Rc<RefCell<..>>` inside,
//! cheap clones outside. The store maps component identity to that
//! component's [`ComponentBinding`]; completion callbacks capture only a
//! `Weak` engine reference plus the two identities they need, and look the
//! binding up again at dispatch time. Liveness is therefore a property of
//! the store, not of the callback: once a binding is removed, every late
//! settle or emission drops out without mutating anything.
//!
//! # Invariants
//!
//! 1. `read` never panics and never returns an error; misuse is reported to
//!    the diagnostic sink and reads as `Pending`.
//! 2. A re-render is requested exactly once per one-shot settlement and once
//!    per stream emission that lands in a live binding.
//! 3. `request_rerender` is never called while the store is borrowed.
//! 4. The store holds a binding for a component iff that component has
//!    outstanding async work (or its binding-creating render pass has not
//!    finished yet).
//!
//! # Failure Modes
//!
//! - **Source completes after teardown**: dispatch finds no binding, leaves
//!   a `trace!` breadcrumb, requests nothing.
//! - **Subscription vanishes mid-establishment**: the fresh guard is
//!   cancelled on the spot instead of being stored.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use tether_core::{
    Classified, ComponentId, OneShotSource, Readiness, Source, SourceId, StreamSource, Value,
    classify,
};

use crate::binding::{ComponentBinding, StreamSlot};
use crate::fault::{DiagnosticSink, Fault, TracingSink};
use crate::host::Host;
use crate::intercept;

/// Shared engine state. Crate-internal; reached through [`Binder`].
pub(crate) struct BinderInner<R> {
    pub(crate) host: Rc<dyn Host<R>>,
    pub(crate) sink: Rc<dyn DiagnosticSink>,
    pub(crate) bindings: RefCell<HashMap<ComponentId, ComponentBinding<R>>>,
}

/// The async binding engine.
///
/// Cloning a `Binder` creates a new handle to the **same** engine.
pub struct Binder<R> {
    inner: Rc<BinderInner<R>>,
}

impl<R> Clone for Binder<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for Binder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("bound_components", &self.inner.bindings.borrow().len())
            .finish()
    }
}

impl<R: Default + 'static> Binder<R> {
    /// Create an engine reporting faults as `tracing` warnings.
    #[must_use]
    pub fn new(host: Rc<dyn Host<R>>) -> Self {
        Self::with_sink(host, Rc::new(TracingSink))
    }

    /// Create an engine with a custom diagnostic sink.
    #[must_use]
    pub fn with_sink(host: Rc<dyn Host<R>>, sink: Rc<dyn DiagnosticSink>) -> Self {
        Self {
            inner: Rc::new(BinderInner {
                host,
                sink,
                bindings: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Read the latest value of an async source from inside a render pass.
    ///
    /// Returns [`Readiness::Pending`] until the source has produced a value;
    /// afterwards, the most recent value on every call. Reading subscribes
    /// on first use and triggers one re-render request per new value. The
    /// engine decorates the component's lifecycle hooks on the first read so
    /// that unused subscriptions are cancelled after each render and
    /// everything is torn down on disconnect.
    pub fn read(&self, source: &dyn Source) -> Readiness<Value> {
        let Some(component) = self.inner.host.current_component() else {
            self.inner.sink.report(&Fault::ReadOutsideRender);
            return Readiness::Pending;
        };
        match classify(source) {
            Classified::OneShot(one_shot) => self.read_one_shot(component, source.id(), one_shot),
            Classified::Stream(stream) => self.read_stream(component, source.id(), stream),
            Classified::Invalid => {
                self.inner.sink.report(&Fault::InvalidSource { id: source.id() });
                Readiness::Pending
            }
        }
    }

    /// Typed variant of [`Binder::read`].
    ///
    /// A ready value of the wrong concrete type is reported as
    /// [`Fault::ValueType`] and reads as `Pending`.
    pub fn read_as<T: 'static>(&self, source: &dyn Source) -> Readiness<Rc<T>> {
        match self.read(source).downcast::<T>() {
            Ok(read) => read,
            Err(_) => {
                self.inner.sink.report(&Fault::ValueType {
                    id: source.id(),
                    expected: std::any::type_name::<T>(),
                });
                Readiness::Pending
            }
        }
    }

    /// Whether a component currently has a binding.
    #[must_use]
    pub fn is_bound(&self, component: ComponentId) -> bool {
        self.inner.bindings.borrow().contains_key(&component)
    }

    /// Components with live bindings, in id order.
    #[must_use]
    pub fn bound_components(&self) -> Vec<ComponentId> {
        let mut components: Vec<ComponentId> =
            self.inner.bindings.borrow().keys().copied().collect();
        components.sort_unstable();
        components
    }

    /// Number of one-shot sources tracked for a component.
    #[must_use]
    pub fn one_shot_count(&self, component: ComponentId) -> usize {
        self.inner
            .bindings
            .borrow()
            .get(&component)
            .map_or(0, ComponentBinding::one_shot_count)
    }

    /// Number of stream subscriptions held for a component.
    #[must_use]
    pub fn stream_count(&self, component: ComponentId) -> usize {
        self.inner
            .bindings
            .borrow()
            .get(&component)
            .map_or(0, ComponentBinding::stream_count)
    }

    /// Tear down every live binding (host shutdown path). Idempotent.
    pub fn disconnect_all(&self) {
        for component in self.bound_components() {
            intercept::destroy(&self.inner, component);
        }
    }

    fn ensure_bound(&self, component: ComponentId) -> bool {
        if self.inner.bindings.borrow().contains_key(&component) {
            return true;
        }
        let Some(slots) = self.inner.host.hooks(component) else {
            self.inner.sink.report(&Fault::UnknownComponent { component });
            return false;
        };
        intercept::install(&self.inner, component, &slots);
        true
    }

    fn read_one_shot(
        &self,
        component: ComponentId,
        source: SourceId,
        one_shot: &dyn OneShotSource,
    ) -> Readiness<Value> {
        if !self.ensure_bound(component) {
            return Readiness::Pending;
        }

        let cached = self
            .inner
            .bindings
            .borrow()
            .get(&component)
            .and_then(|binding| binding.one_shots.get(&source).cloned());
        match cached {
            Some(Some(value)) => Readiness::Ready(value),
            Some(None) => Readiness::Pending,
            None => {
                // First read: record the entry as pending, then attach. The
                // continuation must find the entry if it runs synchronously.
                if let Some(binding) = self.inner.bindings.borrow_mut().get_mut(&component) {
                    binding.one_shots.insert(source, None);
                }
                let weak = Rc::downgrade(&self.inner);
                one_shot.on_settle(Box::new(move |value| {
                    if let Some(inner) = weak.upgrade() {
                        dispatch_settle(&inner, component, source, value);
                    }
                }));
                // An already-settled source runs its continuation
                // synchronously, so the cache may be populated by now.
                self.inner
                    .bindings
                    .borrow()
                    .get(&component)
                    .and_then(|binding| binding.one_shots.get(&source).cloned())
                    .flatten()
                    .into()
            }
        }
    }

    fn read_stream(
        &self,
        component: ComponentId,
        source: SourceId,
        stream: &dyn StreamSource,
    ) -> Readiness<Value> {
        if !self.ensure_bound(component) {
            return Readiness::Pending;
        }

        let already_subscribed = {
            let mut bindings = self.inner.bindings.borrow_mut();
            let Some(binding) = bindings.get_mut(&component) else {
                return Readiness::Pending;
            };
            binding.mark_used(source);
            if binding.streams.contains_key(&source) {
                true
            } else {
                // Placeholder before subscribing: the source may emit
                // synchronously from inside `attach`, and that emission must
                // find its slot.
                binding.streams.insert(source, StreamSlot::placeholder());
                false
            }
        };

        if !already_subscribed {
            let weak = Rc::downgrade(&self.inner);
            let guard = stream.attach(Box::new(move |value| {
                if let Some(inner) = weak.upgrade() {
                    dispatch_emit(&inner, component, source, value);
                }
            }));
            let mut bindings = self.inner.bindings.borrow_mut();
            match bindings
                .get_mut(&component)
                .and_then(|binding| binding.streams.get_mut(&source))
            {
                Some(slot) => slot.guard = Some(guard),
                None => {
                    // The binding vanished while subscribing; detach on the
                    // spot rather than holding a subscription nobody owns.
                    drop(bindings);
                    let mut guard = guard;
                    guard.cancel();
                }
            }
        }

        self.inner
            .bindings
            .borrow()
            .get(&component)
            .and_then(|binding| binding.streams.get(&source))
            .and_then(|slot| slot.last.clone())
            .into()
    }
}

/// Store a settled one-shot value and request a re-render. Late settles
/// (binding or entry gone) drop out; the cache transitions at most once.
fn dispatch_settle<R>(
    inner: &Rc<BinderInner<R>>,
    component: ComponentId,
    source: SourceId,
    value: Value,
) {
    {
        let mut bindings = inner.bindings.borrow_mut();
        let Some(binding) = bindings.get_mut(&component) else {
            trace!(
                component = component.get(),
                source = source.get(),
                "late settle dropped"
            );
            return;
        };
        let Some(slot) = binding.one_shots.get_mut(&source) else {
            trace!(
                component = component.get(),
                source = source.get(),
                "settle for untracked source dropped"
            );
            return;
        };
        if slot.is_some() {
            return;
        }
        *slot = Some(value);
    }
    inner.host.request_rerender(component);
}

/// Cache a stream emission and request a re-render. Late emissions (binding
/// or slot gone) drop out.
fn dispatch_emit<R>(
    inner: &Rc<BinderInner<R>>,
    component: ComponentId,
    source: SourceId,
    value: Value,
) {
    {
        let mut bindings = inner.bindings.borrow_mut();
        let Some(slot) = bindings
            .get_mut(&component)
            .and_then(|binding| binding.streams.get_mut(&source))
        else {
            trace!(
                component = component.get(),
                source = source.get(),
                "late emission dropped"
            );
            return;
        };
        slot.last = Some(value);
    }
    inner.host.request_rerender(component);
}
