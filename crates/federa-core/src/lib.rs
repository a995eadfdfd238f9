// SPDX-License-Identifier: Apache-2.0

//! Shared types and error handling for the federa federation layer.

pub mod error;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use types::*;
