#![forbid(unsafe_code)]

//! Lifecycle interception: wrap a component's hooks, reap after render,
//! restore on teardown.
//!
//! # Design
//!
//! [`install`] snapshots the component's current connect/disconnect/render
//! hooks exactly once and swaps decorating wrappers into the slots. The
//! wrappers hold only `Weak` references to the engine (and, for connect,
//! to the slots), so an orphaned wrapper degrades to a delegating shim
//! instead of keeping the engine alive. [`destroy`] cancels every stream
//! subscription, removes the binding, and puts the snapshot back verbatim —
//! including `None` for hooks that never existed, and including a previous
//! interception layer's wrappers if installation ever stacked.
//!
//! # Invariants
//!
//! 1. `install` on an already-bound component is a no-op (the guard also
//!    prevents wrappers from ever being snapshotted as "originals").
//! 2. `destroy` on an unbound component is a no-op.
//! 3. The binding entry is removed *before* guards are cancelled, so any
//!    completion dispatched during teardown finds no binding and drops out.
//! 4. The reaper runs strictly after the original render returns and before
//!    the render wrapper returns.

use std::rc::Rc;

use tracing::{debug, trace};

use tether_core::ComponentId;

use crate::binder::BinderInner;
use crate::binding::{ComponentBinding, OriginalHooks};
use crate::host::{ConnectFn, DisconnectFn, HookSlots, RenderFn};

/// Install the interceptor for `component` and create its binding.
///
/// Idempotent: if the component is already bound, its slots are already
/// wrapped and nothing happens.
pub(crate) fn install<R: Default + 'static>(
    inner: &Rc<BinderInner<R>>,
    component: ComponentId,
    slots: &Rc<HookSlots<R>>,
) {
    if inner.bindings.borrow().contains_key(&component) {
        return;
    }

    // Captured exactly once; restored verbatim by `destroy`.
    let original = OriginalHooks {
        connect: slots.connect(),
        disconnect: slots.disconnect(),
        render: slots.render(),
    };

    // Connect: make sure the binding exists, then defer to the original.
    let weak_inner = Rc::downgrade(inner);
    let weak_slots = Rc::downgrade(slots);
    let original_connect = original.connect.clone();
    let connect: ConnectFn = Rc::new(move || {
        if let (Some(inner), Some(slots)) = (weak_inner.upgrade(), weak_slots.upgrade()) {
            install(&inner, component, &slots);
        }
        if let Some(hook) = &original_connect {
            hook();
        }
    });
    slots.set_connect(Some(connect));

    // Disconnect: tear the binding down, then defer to the original.
    let weak_inner = Rc::downgrade(inner);
    let original_disconnect = original.disconnect.clone();
    let disconnect: DisconnectFn = Rc::new(move || {
        if let Some(inner) = weak_inner.upgrade() {
            destroy(&inner, component);
        }
        if let Some(hook) = &original_disconnect {
            hook();
        }
    });
    slots.set_disconnect(Some(disconnect));

    // Render: reset usage tracking, run the original, reap what it did not
    // read, and pass its output through untouched.
    let weak_inner = Rc::downgrade(inner);
    let original_render = original.render.clone();
    let render: RenderFn<R> = Rc::new(move || {
        let inner = weak_inner.upgrade();
        if let Some(inner) = &inner {
            if let Some(binding) = inner.bindings.borrow_mut().get_mut(&component) {
                binding.begin_pass();
            }
        }
        let output = match &original_render {
            Some(hook) => hook(),
            None => R::default(),
        };
        if let Some(inner) = &inner {
            finish_pass(inner, component);
        }
        output
    });
    slots.set_render(Some(render));

    inner
        .bindings
        .borrow_mut()
        .insert(component, ComponentBinding::new(original));
    debug!(component = component.get(), "async binding installed");
}

/// Cancel all subscriptions, drop the binding, and restore the hook
/// snapshot. No-op if the component is not bound.
pub(crate) fn destroy<R: 'static>(inner: &Rc<BinderInner<R>>, component: ComponentId) {
    // Remove the entry first: a completion dispatched from here on finds no
    // binding and becomes a no-op.
    let Some(mut binding) = inner.bindings.borrow_mut().remove(&component) else {
        return;
    };
    for (_, mut slot) in binding.streams.drain() {
        slot.cancel();
    }

    // Put the snapshot back, absence included. A host that has already
    // forgotten the component has no slots left to restore into.
    if let Some(slots) = inner.host.hooks(component) {
        let OriginalHooks {
            connect,
            disconnect,
            render,
        } = binding.original_hooks;
        slots.set_connect(connect);
        slots.set_disconnect(disconnect);
        slots.set_render(render);
    }
    debug!(component = component.get(), "async binding destroyed");
}

/// Reap streams the pass in progress did not read; destroy the binding if
/// nothing is left.
pub(crate) fn finish_pass<R: 'static>(inner: &Rc<BinderInner<R>>, component: ComponentId) {
    let (unused, idle) = {
        let mut bindings = inner.bindings.borrow_mut();
        let Some(binding) = bindings.get_mut(&component) else {
            return;
        };
        (binding.take_unused(), binding.is_idle())
    };
    // Guards are cancelled outside the store borrow; a guard is allowed to
    // run arbitrary detach logic.
    for (source, mut slot) in unused {
        slot.cancel();
        trace!(
            component = component.get(),
            source = source.get(),
            "unused stream reaped"
        );
    }
    if idle {
        destroy(inner, component);
    }
}
