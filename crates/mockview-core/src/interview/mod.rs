//! Interview domain module.
//!
//! - `model`: the `Interview` entity and duration bounds
//! - `repository`: repository trait for interview persistence

mod model;
mod repository;

pub use model::{Interview, InterviewUpdate, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
pub use repository::InterviewRepository;
