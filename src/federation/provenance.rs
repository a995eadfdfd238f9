// SPDX-License-Identifier: Apache-2.0

//! Provenance tracking
//!
//! Every handle the router hands out claims the federation as its owner. The
//! tracker remembers which backend really produced it, keyed by the handle's
//! arena id, so a rewritten or cloned handle still routes to its true owner.
//!
//! Each tracker draws a process-unique arena tag, so a handle presented by one
//! router is never mistaken for an entry of another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use federa_core::{ConnectionId, EngineError, EngineResult};
use federa_query::{HandleId, HandleOwner, TableHandle};
use serde::{Deserialize, Serialize};

/// True origin of a table handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// The router's own local engine.
    Local,
    /// A registered connection, by registration id.
    Connection(ConnectionId),
}

impl Origin {
    pub fn is_local(&self) -> bool {
        matches!(self, Origin::Local)
    }
}

// arena 0 belongs to HandleId::UNBOUND
static NEXT_ARENA: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct ProvenanceTracker {
    arena: u64,
    next_index: u64,
    origins: HashMap<HandleId, Origin>,
}

impl Default for ProvenanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceTracker {
    pub fn new() -> Self {
        Self {
            arena: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            next_index: 1,
            origins: HashMap::new(),
        }
    }

    /// Tag carried by every id this tracker issues.
    pub fn arena(&self) -> u64 {
        self.arena
    }

    /// Rewrites a backend handle into one presented by the federation and
    /// records where it came from. Local origins are left implicit.
    pub fn present(&mut self, raw: &TableHandle, origin: Origin) -> TableHandle {
        let id = HandleId::new(self.arena, self.next_index);
        self.next_index += 1;

        let handle = raw.rebind(id, HandleOwner::Federation);
        if !origin.is_local() {
            self.record(id, origin);
        }
        handle
    }

    /// Records `origin` for `id`; a second record for the same id overwrites.
    pub fn record(&mut self, id: HandleId, origin: Origin) {
        self.origins.insert(id, origin);
    }

    /// True origin of `id`, or `Local` when nothing was recorded.
    ///
    /// Fails for an id issued by another tracker.
    pub fn lookup(&self, id: HandleId) -> EngineResult<Origin> {
        if id.is_bound() && id.arena() != self.arena {
            return Err(EngineError::invalid_expression(format!(
                "table handle {id} was resolved by a different federation instance"
            )));
        }
        Ok(self.origins.get(&id).copied().unwrap_or(Origin::Local))
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use federa_core::{ColumnInfo, Namespace, TableSchema};

    fn raw(backend: &str) -> TableHandle {
        TableHandle::physical(
            backend,
            "orders",
            Namespace::default(),
            TableSchema::new(vec![ColumnInfo::new("id", "BIGINT")]),
        )
    }

    #[test]
    fn present_assigns_fresh_ids() {
        let mut tracker = ProvenanceTracker::new();
        let origin = Origin::Connection(ConnectionId::new());

        let first = tracker.present(&raw("a"), origin);
        let second = tracker.present(&raw("a"), origin);

        assert_ne!(first.id(), second.id());
        assert!(first.id().is_bound());
        assert_eq!(first.owner(), &HandleOwner::Federation);
        assert_eq!(first.id().arena(), tracker.arena());
        assert_eq!(tracker.lookup(first.id()).unwrap(), origin);
        assert_eq!(tracker.lookup(second.id()).unwrap(), origin);
    }

    #[test]
    fn clones_share_provenance() {
        let mut tracker = ProvenanceTracker::new();
        let origin = Origin::Connection(ConnectionId::new());
        let handle = tracker.present(&raw("a"), origin);

        let copy = handle.clone();
        assert_eq!(tracker.lookup(copy.id()).unwrap(), origin);
    }

    #[test]
    fn local_origin_is_not_stored() {
        let mut tracker = ProvenanceTracker::new();
        let handle = tracker.present(&raw("local"), Origin::Local);

        assert!(tracker.is_empty());
        assert_eq!(tracker.lookup(handle.id()).unwrap(), Origin::Local);
    }

    #[test]
    fn unknown_ids_default_to_local() {
        let tracker = ProvenanceTracker::new();
        let unrecorded = HandleId::new(tracker.arena(), 42);
        assert_eq!(tracker.lookup(unrecorded).unwrap(), Origin::Local);
        assert_eq!(tracker.lookup(HandleId::UNBOUND).unwrap(), Origin::Local);
    }

    #[test]
    fn ids_from_another_tracker_are_rejected() {
        let mut first = ProvenanceTracker::new();
        let second = ProvenanceTracker::new();
        assert_ne!(first.arena(), second.arena());

        let handle = first.present(&raw("a"), Origin::Connection(ConnectionId::new()));
        let err = second.lookup(handle.id()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidExpression { .. }));
    }

    #[test]
    fn record_is_idempotent_and_last_write_wins() {
        let mut tracker = ProvenanceTracker::new();
        let a = Origin::Connection(ConnectionId::new());
        let b = Origin::Connection(ConnectionId::new());

        let id = HandleId::new(tracker.arena(), 5);

        tracker.record(id, a);
        tracker.record(id, a);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.lookup(id).unwrap(), a);

        tracker.record(id, b);
        assert_eq!(tracker.lookup(id).unwrap(), b);
    }
}
