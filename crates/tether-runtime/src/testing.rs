#![forbid(unsafe_code)]

//! Test-support doubles: an in-memory host and a recording diagnostic sink.
//!
//! [`StubHost`] is a minimal host component model: it owns hook slots per
//! component, drives renders one at a time, and logs re-render requests
//! instead of scheduling them — tests decide when the "next pass" happens by
//! calling [`StubHost::render`] again, which is exactly the fire-and-forget
//! contract the engine is written against. Nested renders are not supported.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tether_core::ComponentId;

use crate::fault::{DiagnosticSink, Fault};
use crate::host::{Host, HookSlots};

/// In-memory host for driving the engine in tests.
pub struct StubHost<R> {
    components: RefCell<HashMap<ComponentId, Rc<HookSlots<R>>>>,
    current: Cell<Option<ComponentId>>,
    rerenders: RefCell<Vec<ComponentId>>,
}

impl<R> StubHost<R> {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            components: RefCell::new(HashMap::new()),
            current: Cell::new(None),
            rerenders: RefCell::new(Vec::new()),
        })
    }

    /// Register a component from its hook slots; returns its identity.
    pub fn add_component(&self, slots: HookSlots<R>) -> ComponentId {
        let component = ComponentId::fresh();
        self.components
            .borrow_mut()
            .insert(component, Rc::new(slots));
        component
    }

    /// The component's hook slots, if registered.
    #[must_use]
    pub fn slots(&self, component: ComponentId) -> Option<Rc<HookSlots<R>>> {
        self.components.borrow().get(&component).cloned()
    }

    /// Invoke the component's connect hook.
    pub fn connect(&self, component: ComponentId) {
        if let Some(slots) = self.slots(component) {
            slots.run_connect();
        }
    }

    /// Invoke the component's disconnect hook.
    pub fn disconnect(&self, component: ComponentId) {
        if let Some(slots) = self.slots(component) {
            slots.run_disconnect();
        }
    }

    /// Forget a component entirely (without running any hook).
    pub fn remove_component(&self, component: ComponentId) {
        self.components.borrow_mut().remove(&component);
    }

    /// Every re-render request logged so far, in order.
    #[must_use]
    pub fn rerender_log(&self) -> Vec<ComponentId> {
        self.rerenders.borrow().clone()
    }

    /// Number of re-render requests logged for one component.
    #[must_use]
    pub fn rerender_count(&self, component: ComponentId) -> usize {
        self.rerenders
            .borrow()
            .iter()
            .filter(|requested| **requested == component)
            .count()
    }

    /// Drop the logged re-render requests.
    pub fn clear_rerenders(&self) {
        self.rerenders.borrow_mut().clear();
    }

    /// Override the "currently rendering" answer (for misuse tests).
    pub fn force_current(&self, component: Option<ComponentId>) {
        self.current.set(component);
    }
}

impl<R: Default> StubHost<R> {
    /// Drive one render pass for a component, returning its output (or
    /// `None` if the component is not registered).
    pub fn render(&self, component: ComponentId) -> Option<R> {
        let slots = self.slots(component)?;
        self.current.set(Some(component));
        let output = slots.run_render();
        self.current.set(None);
        Some(output)
    }
}

impl<R> Host<R> for StubHost<R> {
    fn hooks(&self, component: ComponentId) -> Option<Rc<HookSlots<R>>> {
        self.slots(component)
    }

    fn request_rerender(&self, component: ComponentId) {
        self.rerenders.borrow_mut().push(component);
    }

    fn current_component(&self) -> Option<ComponentId> {
        self.current.get()
    }
}

/// Sink that stores every fault for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    faults: RefCell<Vec<Fault>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Every fault reported so far, in order.
    #[must_use]
    pub fn faults(&self) -> Vec<Fault> {
        self.faults.borrow().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, fault: &Fault) {
        self.faults.borrow_mut().push(fault.clone());
    }
}
