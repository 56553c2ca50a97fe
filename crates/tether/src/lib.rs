#![forbid(unsafe_code)]

//! Tether public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use tether_core as core;
    pub use tether_runtime as runtime;

    pub use tether_core::{Deferred, Feed, Readiness, Value};
    pub use tether_runtime::{Binder, HookSlots};
}
