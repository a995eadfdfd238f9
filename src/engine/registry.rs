// SPDX-License-Identifier: Apache-2.0

//! Connection Registry
//!
//! Holds the backends registered with a federation instance, in registration
//! order. The order is the router's search order. The local engine is never
//! stored here.

use std::sync::Arc;

use federa_core::{ConnectionId, EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::pattern::NamePattern;
use crate::engine::traits::Backend;

/// What to do when a name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateConnection`.
    #[default]
    Reject,
    /// Swap the backend in place under a fresh id, keeping the search position.
    Replace,
}

/// A backend together with its registration identity
#[derive(Clone)]
pub struct RegisteredConnection {
    id: ConnectionId,
    name: String,
    backend: Arc<dyn Backend>,
}

impl RegisteredConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl std::fmt::Debug for RegisteredConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredConnection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("driver", &self.backend.driver_id())
            .finish()
    }
}

/// Registry of all connections known to one federation instance
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Vec<RegisteredConnection>,
    policy: DuplicatePolicy,
}

impl ConnectionRegistry {
    /// Creates a new empty registry that rejects duplicate names
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::Reject)
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            connections: Vec::new(),
            policy,
        }
    }

    /// Registers a backend under `name`, or under its own declared name
    pub fn add(
        &mut self,
        backend: Arc<dyn Backend>,
        name: Option<&str>,
    ) -> EngineResult<ConnectionId> {
        let name = name.unwrap_or_else(|| backend.name()).trim().to_string();
        if name.is_empty() {
            return Err(EngineError::validation("Connection name cannot be empty"));
        }

        let id = ConnectionId::new();
        let entry = RegisteredConnection {
            id,
            name: name.clone(),
            backend,
        };

        match self.connections.iter().position(|c| c.name == name) {
            Some(_) if self.policy == DuplicatePolicy::Reject => {
                Err(EngineError::duplicate_connection(name))
            }
            Some(pos) => {
                info!(connection = %name, %id, "Replacing registered connection");
                self.connections[pos] = entry;
                Ok(id)
            }
            None => {
                info!(connection = %name, %id, driver = entry.backend.driver_id(), "Registered connection");
                self.connections.push(entry);
                Ok(id)
            }
        }
    }

    /// Removes the named connection
    pub fn remove(&mut self, name: &str) -> EngineResult<RegisteredConnection> {
        let pos = self
            .connections
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EngineError::unknown_connection(name))?;
        let removed = self.connections.remove(pos);
        info!(connection = %name, id = %removed.id, "Dropped connection");
        Ok(removed)
    }

    /// Lists connections in registration order, optionally filtered by name
    pub fn list(&self, filter: Option<&NamePattern>) -> Vec<&RegisteredConnection> {
        self.connections
            .iter()
            .filter(|c| filter.map_or(true, |p| p.matches(&c.name)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredConnection> {
        self.connections.iter().find(|c| c.name == name)
    }

    pub fn get_by_id(&self, id: ConnectionId) -> Option<&RegisteredConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredConnection> {
        self.connections.iter()
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Returns the number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
