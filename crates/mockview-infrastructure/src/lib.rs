//! Infrastructure layer for Mockview.
//!
//! Storage backends (in-memory and directory/JSON), filesystem paths, and
//! the configuration service.

pub mod config_service;
pub mod dir;
pub mod memory;
pub mod paths;

pub use config_service::ConfigService;
pub use dir::{DirInterviewRepository, DirTurnStore};
pub use memory::{MemoryInterviewRepository, MemoryTurnStore};
pub use paths::MockviewPaths;
