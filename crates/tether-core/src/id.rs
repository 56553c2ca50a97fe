#![forbid(unsafe_code)]

//! Identity tokens for sources and components.
//!
//! Both engines key their bookkeeping by object identity, not by value.
//! Identity is a process-unique `u64` handed out by a monotonic counter;
//! clones of a source share the id of the original, so a cloned handle
//! resolves to the same binding entry.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one async source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Allocate a fresh, process-unique source id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value (for tracing/logging).
    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Identity of one host component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh, process-unique component id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value (for tracing/logging).
    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_are_unique() {
        let a = SourceId::fresh();
        let b = SourceId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn component_ids_are_unique() {
        let a = ComponentId::fresh();
        let b = ComponentId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_copy_and_hashable() {
        use std::collections::HashMap;
        let id = SourceId::fresh();
        let copy = id;
        let mut map = HashMap::new();
        map.insert(id, 1);
        assert_eq!(map.get(&copy), Some(&1));
    }
}
