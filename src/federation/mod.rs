// SPDX-License-Identifier: Apache-2.0

//! Federation Layer
//!
//! Presents several independent backends as one logical engine: names are
//! resolved against whichever backend owns them, expressions run where their
//! tables live, and results can be cached into the local DuckDB engine.

pub mod cache;
pub mod naming;
pub mod provenance;
pub mod router;

pub use cache::{CacheKey, CacheMaterializer};
pub use naming::NameAllocator;
pub use provenance::{Origin, ProvenanceTracker};
pub use router::{Router, LOCAL_ENGINE_NAME};
