// SPDX-License-Identifier: Apache-2.0

//! Reference-counted name allocation
//!
//! Hands out one stable, generated name per identity key and counts how many
//! times each name was asked for. Nothing is ever evicted; the counts are
//! exposed so callers can build their own eviction policy on top.

use std::collections::HashMap;
use std::hash::Hash;

use uuid::Uuid;

type Generator<V> = Box<dyn Fn(&V) -> String + Send + Sync>;
type KeyFn<V, K> = Box<dyn Fn(&V) -> K + Send + Sync>;

/// `{prefix}_{32 hex digits}`
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

pub struct NameAllocator<V, K = V> {
    generate: Generator<V>,
    key: KeyFn<V, K>,
    names: HashMap<K, String>,
    counts: HashMap<String, u64>,
}

impl<V> NameAllocator<V, V>
where
    V: Clone + Eq + Hash + 'static,
{
    /// Allocator keyed by the value itself.
    pub fn new(generate: impl Fn(&V) -> String + Send + Sync + 'static) -> Self {
        Self::with_key(generate, V::clone)
    }

    /// Allocator producing `{prefix}_{uuid}` names.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |_| unique_name(&prefix))
    }
}

impl<V, K> NameAllocator<V, K>
where
    K: Eq + Hash,
{
    pub fn with_key(
        generate: impl Fn(&V) -> String + Send + Sync + 'static,
        key: impl Fn(&V) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            generate: Box::new(generate),
            key: Box::new(key),
            names: HashMap::new(),
            counts: HashMap::new(),
        }
    }

    /// Name for `value`, generated on first use of its key. Bumps the count.
    pub fn name_for(&mut self, value: &V) -> String {
        let key = (self.key)(value);
        let name = match self.names.get(&key) {
            Some(name) => name.clone(),
            None => {
                let name = (self.generate)(value);
                self.names.insert(key, name.clone());
                name
            }
        };
        *self.counts.entry(name.clone()).or_insert(0) += 1;
        name
    }

    /// Name already allocated for `value`, without touching its count.
    pub fn peek(&self, value: &V) -> Option<&str> {
        self.names.get(&(self.key)(value)).map(String::as_str)
    }

    pub fn ref_count(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn ref_counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<V, K> std::fmt::Debug for NameAllocator<V, K>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameAllocator")
            .field("names", &self.names)
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}
