//! Core domain layer for Mockview.
//!
//! Pure domain models, traits, and the turn-taking state machine. No IO,
//! no HTTP, no storage format knowledge; those live in the infrastructure,
//! interaction, and application crates.

pub mod config;
pub mod error;
pub mod generation;
pub mod interview;
pub mod session;

// Re-export common error type
pub use error::{MockviewError, Result};
