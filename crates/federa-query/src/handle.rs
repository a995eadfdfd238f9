// SPDX-License-Identifier: Apache-2.0

//! Table handles
//!
//! A handle is what a caller holds after resolving a table name. Backends hand
//! out *unbound* handles that name themselves as owner; the federation layer
//! rewrites them into bound handles whose presented owner is the federation
//! itself and whose [`HandleId`] keys the provenance map.

use std::fmt;

use compact_str::CompactString;
use federa_core::{Namespace, TableSchema};
use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Stable identity of a presented handle
///
/// Cloning a handle keeps its id, so every copy of an expression still finds
/// the same provenance entry. The arena tag names the provenance map that
/// issued the id; the index is unique within that arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId {
    arena: u64,
    index: u64,
}

impl HandleId {
    /// Identity of a handle straight from a backend, never recorded.
    pub const UNBOUND: HandleId = HandleId { arena: 0, index: 0 };

    pub const fn new(arena: u64, index: u64) -> Self {
        Self { arena, index }
    }

    pub fn arena(self) -> u64 {
        self.arena
    }

    pub fn index(self) -> u64 {
        self.index
    }

    pub fn is_bound(self) -> bool {
        self != Self::UNBOUND
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.arena, self.index)
    }
}

/// Owner a handle claims to belong to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleOwner {
    /// Rewritten by the federation layer; true owner lives in the provenance map.
    Federation,
    /// Produced directly by the named backend.
    Backend(CompactString),
}

/// A named, schema-bearing relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    id: HandleId,
    name: String,
    namespace: Namespace,
    schema: TableSchema,
    owner: HandleOwner,
}

impl TableHandle {
    /// Handle as produced by a backend resolving one of its own tables.
    pub fn physical(
        backend: &str,
        name: impl Into<String>,
        namespace: Namespace,
        schema: TableSchema,
    ) -> Self {
        Self {
            id: HandleId::UNBOUND,
            name: name.into(),
            namespace,
            schema,
            owner: HandleOwner::Backend(backend.into()),
        }
    }

    /// Structurally identical copy carrying a new identity and presented owner.
    pub fn rebind(&self, id: HandleId, owner: HandleOwner) -> Self {
        Self {
            id,
            owner,
            ..self.clone()
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn owner(&self) -> &HandleOwner {
        &self.owner
    }

    pub fn to_expr(&self) -> Expr {
        Expr::Table(self.clone())
    }
}

impl From<TableHandle> for Expr {
    fn from(handle: TableHandle) -> Self {
        Expr::Table(handle)
    }
}
