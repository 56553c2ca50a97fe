#![forbid(unsafe_code)]

//! Fault taxonomy and the diagnostic channel.
//!
//! Engine misuse never propagates as a `Result` out of the read operation:
//! every fault is reported to a [`DiagnosticSink`] and the read returns
//! `Readiness::Pending`, so a render pass cannot fail through the engine.
//! Late completions and double teardown are not faults at all — they are
//! silent no-ops by design and only leave `trace!` breadcrumbs.

use thiserror::Error;
use tracing::warn;

use tether_core::{ComponentId, SourceId};

/// A non-fatal engine fault, reported out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The value handed to the read operation exposes neither the one-shot
    /// nor the stream capability.
    #[error("source {} is neither a one-shot nor a stream", .id.get())]
    InvalidSource {
        /// Identity of the rejected source.
        id: SourceId,
    },

    /// The read operation ran while no component was rendering.
    #[error("async read outside a render pass")]
    ReadOutsideRender,

    /// The host has no hook slots for the component that is rendering.
    #[error("host has no hook slots for component {}", .component.get())]
    UnknownComponent {
        /// Identity of the unknown component.
        component: ComponentId,
    },

    /// A typed read observed a value of a different concrete type.
    #[error("source {} produced a value that is not a {expected}", .id.get())]
    ValueType {
        /// Identity of the mismatched source.
        id: SourceId,
        /// The type the reader asked for.
        expected: &'static str,
    },
}

/// Out-of-band channel for engine faults.
pub trait DiagnosticSink {
    /// Report one fault. Must not panic and must not call back into the
    /// engine.
    fn report(&self, fault: &Fault);
}

/// Default sink: emits each fault as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, fault: &Fault) {
        warn!(fault = %fault, "async binding fault");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_messages_name_the_problem() {
        let id = SourceId::fresh();
        let fault = Fault::InvalidSource { id };
        assert!(fault.to_string().contains("neither a one-shot nor a stream"));

        assert_eq!(
            Fault::ReadOutsideRender.to_string(),
            "async read outside a render pass"
        );

        let component = ComponentId::fresh();
        let fault = Fault::UnknownComponent { component };
        assert!(fault.to_string().contains("no hook slots"));

        let fault = Fault::ValueType {
            id,
            expected: "alloc::string::String",
        };
        assert!(fault.to_string().contains("String"));
    }

    #[test]
    fn tracing_sink_accepts_faults() {
        // No subscriber installed: must be a silent no-op, not a panic.
        TracingSink.report(&Fault::ReadOutsideRender);
    }
}
