#![forbid(unsafe_code)]

//! Async binding engine for render-driven components.
//!
//! A component's render function reads the latest value of an async source —
//! a one-shot deferred value or a multi-emission stream — synchronously via
//! [`Binder::read`], getting `Pending` until a value arrives and exactly one
//! re-render request per new value. The engine does the bookkeeping that
//! makes this safe without the component author's cooperation:
//!
//! - a **registration store** mapping component identity to its binding
//!   state, created on first read and torn down when no async work remains;
//! - a **lifecycle interceptor** that decorates the component's
//!   connect/disconnect/render hook slots, installed lazily and fully
//!   reversible (the exact original hooks come back, absence included);
//! - a **value cache & dispatcher** holding the last observed value per
//!   source and its cancellation guard, subscribing once per source;
//! - a **usage tracker & reaper** that cancels any stream the latest render
//!   pass stopped reading.
//!
//! # Architecture
//!
//! Single-threaded, event-driven: `Rc`/`RefCell` shared state, no locks.
//! Completion callbacks hold a `Weak` engine reference and re-resolve their
//! binding at dispatch time, so teardown makes late completions inert.
//! The host component model stays external behind the [`Host`] trait: hook
//! slot access, re-render scheduling, and the "which component is rendering"
//! lookup.
//!
//! # Invariants
//!
//! 1. At most one binding per component; installation is idempotent.
//! 2. Every tracked stream holds a live subscription until reaped or torn
//!    down; reaping runs after every decorated render, before it returns.
//! 3. One-shot values are cached forever (until teardown) and never
//!    re-subscribed; streams cache the most recent emission.
//! 4. Misuse never escapes as a panic or error from the read path: faults go
//!    to the [`DiagnosticSink`] and the read yields `Pending`.

pub mod binder;
mod binding;
pub mod fault;
pub mod host;
mod intercept;
pub mod testing;

pub use binder::Binder;
pub use fault::{DiagnosticSink, Fault, TracingSink};
pub use host::{ConnectFn, DisconnectFn, Host, HookSlots, RenderFn};
