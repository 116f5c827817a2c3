//! Interview repository trait.
//!
//! Defines the interface for interview persistence operations.

use super::model::Interview;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for managing interview persistence.
///
/// This trait defines the contract for persisting and retrieving interviews,
/// decoupling the application's core logic from the specific storage
/// mechanism (in-memory map, JSON files on disk, a database).
#[async_trait]
pub trait InterviewRepository: Send + Sync {
    /// Finds an interview by its ID.
    ///
    /// Returns `Ok(None)` when no interview with that ID exists.
    async fn find_by_id(&self, interview_id: &str) -> Result<Option<Interview>>;

    /// Saves an interview, inserting or overwriting by ID.
    async fn save(&self, interview: &Interview) -> Result<()>;

    /// Deletes an interview. Deleting a missing interview is not an error.
    async fn delete(&self, interview_id: &str) -> Result<()>;

    /// Lists all interviews belonging to one owner, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Interview>>;
}
