//! # Vanguard Common
//!
//! Common types, utilities, and shared abstractions for Project Vanguard.
//!
//! This crate provides foundational types used across all Vanguard crates:
//! - ID types (EntityId, FactionId) and an owned ID allocator
//! - The monotonic simulation clock
//! - Version information for data files
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod clock;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
