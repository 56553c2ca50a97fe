#![forbid(unsafe_code)]

//! Host abstraction: hook slots and the scheduling/lookup primitives the
//! engine consumes.
//!
//! The engine decorates a component's lifecycle without the component
//! author's cooperation. The contract that makes this safe is the slot
//! model: the host stores each hook as a replaceable [`Rc`] closure inside a
//! [`HookSlots`] cell, and invokes a hook by cloning the current `Rc` out of
//! its slot before calling it. Swapping a slot therefore affects the *next*
//! invocation, never one already in flight — which is exactly what lets the
//! engine uninstall itself from inside its own render wrapper.
//!
//! # Invariants
//!
//! 1. `run_*` never holds a slot borrow across the hook call.
//! 2. A slot distinguishes "no hook" (`None`) from "hook present"; swaps
//!    preserve that distinction so absence survives an install/uninstall
//!    round trip.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_core::ComponentId;

/// A connect hook.
pub type ConnectFn = Rc<dyn Fn()>;
/// A disconnect hook.
pub type DisconnectFn = Rc<dyn Fn()>;
/// A render hook producing the host's render output type.
pub type RenderFn<R> = Rc<dyn Fn() -> R>;

/// The three optional lifecycle hooks of one component, each independently
/// replaceable.
pub struct HookSlots<R> {
    connect: RefCell<Option<ConnectFn>>,
    disconnect: RefCell<Option<DisconnectFn>>,
    render: RefCell<Option<RenderFn<R>>>,
}

impl<R> HookSlots<R> {
    /// Create slots with no hooks defined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect: RefCell::new(None),
            disconnect: RefCell::new(None),
            render: RefCell::new(None),
        }
    }

    /// Builder: define the connect hook.
    #[must_use]
    pub fn with_connect(self, hook: impl Fn() + 'static) -> Self {
        *self.connect.borrow_mut() = Some(Rc::new(hook));
        self
    }

    /// Builder: define the disconnect hook.
    #[must_use]
    pub fn with_disconnect(self, hook: impl Fn() + 'static) -> Self {
        *self.disconnect.borrow_mut() = Some(Rc::new(hook));
        self
    }

    /// Builder: define the render hook.
    #[must_use]
    pub fn with_render(self, hook: impl Fn() -> R + 'static) -> Self {
        *self.render.borrow_mut() = Some(Rc::new(hook));
        self
    }

    /// Snapshot of the current connect hook.
    #[must_use]
    pub fn connect(&self) -> Option<ConnectFn> {
        self.connect.borrow().clone()
    }

    /// Snapshot of the current disconnect hook.
    #[must_use]
    pub fn disconnect(&self) -> Option<DisconnectFn> {
        self.disconnect.borrow().clone()
    }

    /// Snapshot of the current render hook.
    #[must_use]
    pub fn render(&self) -> Option<RenderFn<R>> {
        self.render.borrow().clone()
    }

    /// Replace the connect slot, returning the previous content.
    pub fn set_connect(&self, hook: Option<ConnectFn>) -> Option<ConnectFn> {
        self.connect.replace(hook)
    }

    /// Replace the disconnect slot, returning the previous content.
    pub fn set_disconnect(&self, hook: Option<DisconnectFn>) -> Option<DisconnectFn> {
        self.disconnect.replace(hook)
    }

    /// Replace the render slot, returning the previous content.
    pub fn set_render(&self, hook: Option<RenderFn<R>>) -> Option<RenderFn<R>> {
        self.render.replace(hook)
    }

    /// Invoke the current connect hook, if any.
    pub fn run_connect(&self) {
        if let Some(hook) = self.connect() {
            hook();
        }
    }

    /// Invoke the current disconnect hook, if any.
    pub fn run_disconnect(&self) {
        if let Some(hook) = self.disconnect() {
            hook();
        }
    }
}

impl<R: Default> HookSlots<R> {
    /// Invoke the current render hook; a component without one renders to
    /// `R::default()`.
    #[must_use]
    pub fn run_render(&self) -> R {
        match self.render() {
            Some(hook) => hook(),
            None => R::default(),
        }
    }
}

impl<R> Default for HookSlots<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for HookSlots<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSlots")
            .field("connect", &self.connect.borrow().is_some())
            .field("disconnect", &self.disconnect.borrow().is_some())
            .field("render", &self.render.borrow().is_some())
            .finish()
    }
}

/// What the engine consumes from the host component model.
pub trait Host<R> {
    /// Hook slots for a component, or `None` if the host does not know it.
    fn hooks(&self, component: ComponentId) -> Option<Rc<HookSlots<R>>>;

    /// Schedule a re-render for a component. Fire-and-forget; the host may
    /// coalesce requests. The engine may call this from completion
    /// callbacks and, for sources that complete synchronously, from inside
    /// a render pass — the host must schedule a *later* pass, never re-enter
    /// the one in progress.
    fn request_rerender(&self, component: ComponentId);

    /// The component currently being rendered, or `None` outside a render
    /// pass.
    fn current_component(&self) -> Option<ComponentId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn run_render_defaults_when_hook_absent() {
        let slots: HookSlots<u32> = HookSlots::new();
        assert_eq!(slots.run_render(), 0);
    }

    #[test]
    fn builders_populate_slots() {
        let slots: HookSlots<u32> = HookSlots::new()
            .with_connect(|| {})
            .with_disconnect(|| {})
            .with_render(|| 5);
        assert!(slots.connect().is_some());
        assert!(slots.disconnect().is_some());
        assert_eq!(slots.run_render(), 5);
    }

    #[test]
    fn set_returns_previous_content() {
        let slots: HookSlots<()> = HookSlots::new().with_connect(|| {});
        let previous = slots.set_connect(None);
        assert!(previous.is_some());
        assert!(slots.connect().is_none());
    }

    #[test]
    fn swap_during_invocation_affects_next_call_only() {
        let slots: Rc<HookSlots<u32>> = Rc::new(HookSlots::new());
        let swapped = Rc::new(Cell::new(false));

        let slots_handle = Rc::clone(&slots);
        let swapped_flag = Rc::clone(&swapped);
        let original: RenderFn<u32> = Rc::new(move || {
            if !swapped_flag.get() {
                swapped_flag.set(true);
                // Replace ourselves mid-call.
                slots_handle.set_render(Some(Rc::new(|| 99)));
            }
            1
        });
        slots.set_render(Some(original));

        // The in-flight invocation still runs the old hook.
        assert_eq!(slots.run_render(), 1);
        // The next one sees the replacement.
        assert_eq!(slots.run_render(), 99);
    }

    #[test]
    fn absence_survives_replace_round_trip() {
        let slots: HookSlots<()> = HookSlots::new();
        let original = slots.set_render(Some(Rc::new(|| ())));
        assert!(original.is_none());
        slots.set_render(original);
        assert!(slots.render().is_none());
    }
}
