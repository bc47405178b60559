//! # tempus-common
//!
//! Foundation layer for Tempus: the triple value model, error types, and
//! cancellation primitives.
//!
//! This crate provides the fundamental building blocks used by all other
//! Tempus crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Value model (Node, Predicate, Literal, Object, Triple)
//! - [`utils`] - Errors and the cancellation context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{Anchor, Literal, Node, Object, Predicate, Triple};
pub use utils::context::Context;
pub use utils::error::{Error, Result, StorageError};
