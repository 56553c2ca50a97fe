#![forbid(unsafe_code)]

//! Core source model for tether.
//!
//! This crate defines the vocabulary shared between async sources and the
//! binding engine in `tether-runtime`:
//!
//! - [`SourceId`] / [`ComponentId`]: stable identity tokens used to key
//!   per-source and per-component bookkeeping.
//! - [`Readiness`]: the "no value observed yet" marker, distinguishable from
//!   every legitimate value (including `()` and unit-like payloads).
//! - [`Source`] and its capability traits [`OneShotSource`] /
//!   [`StreamSource`], plus [`classify`] which picks the read path by
//!   capability inspection.
//! - Reference primitives: [`Deferred`] (settles exactly once) and [`Feed`]
//!   (emits zero or more values until cancelled).
//!
//! The engine never sees concrete primitives, only the capability traits, so
//! any async source can participate by implementing [`Source`].

pub mod feed;
pub mod id;
pub mod oneshot;
pub mod readiness;
pub mod source;

pub use feed::{Feed, FeedGuard};
pub use id::{ComponentId, SourceId};
pub use oneshot::Deferred;
pub use readiness::{Readiness, Value};
pub use source::{
    CancelGuard, Classified, EmitFn, OneShotSource, SettleFn, Source, SourceKind, StreamSource,
    classify,
};
