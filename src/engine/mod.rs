// SPDX-License-Identifier: Apache-2.0

// Backend Module
// Abstraction layer over the physical engines the federation routes to

pub mod drivers;
pub mod pattern;
pub mod registry;
pub mod traits;

pub use pattern::NamePattern;
pub use registry::{ConnectionRegistry, DuplicatePolicy, RegisteredConnection};
pub use traits::{Backend, LocalEngine};
