//! Turn store trait.
//!
//! The turn store is the single shared mutable resource of the session
//! subsystem: an append-only ledger of turns, scoped by interview and by
//! session run. No component mutates turns outside this contract.

use super::model::{SessionRun, Turn};
use crate::error::Result;
use async_trait::async_trait;

/// Durable, ordered persistence of session runs and their turns.
///
/// # Ordering
///
/// Implementations must hand out strictly increasing sequence numbers so the
/// `(created_at, seq)` key is a total order even when timestamps collide
/// under clock skew. Appends to one run are serialized; the application's
/// turn-taking discipline already prevents concurrent appends, but the store
/// must not reorder them either.
///
/// # Append-only
///
/// Turns are never mutated after creation. The only terminal mutation is the
/// `ended` marker on the run, set atomically with the terminal turn append.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Creates a new, active session run for an interview.
    async fn create_run(&self, interview_id: &str) -> Result<SessionRun>;

    /// Finds a session run by ID. Returns `Ok(None)` when unknown.
    async fn find_run(&self, session_run_id: &str) -> Result<Option<SessionRun>>;

    /// Appends a turn to a run.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the run does not exist
    /// - `RunTerminated` if the run already has a terminal turn
    async fn append(
        &self,
        session_run_id: &str,
        system_message: &str,
        candidate_message: &str,
        feedback: Option<String>,
    ) -> Result<Turn>;

    /// All turns of one run, oldest first. This is the sequence the
    /// turn-taking state machine replays.
    async fn list_by_run(&self, session_run_id: &str) -> Result<Vec<Turn>>;

    /// All turns across all runs of one interview, oldest first. Used for
    /// cross-run auditing only, never for live conversation reconstruction.
    async fn list_by_interview(&self, interview_id: &str) -> Result<Vec<Turn>>;

    /// The most recently appended turn across any run of the interview.
    async fn latest_for_interview(&self, interview_id: &str) -> Result<Option<Turn>>;

    /// Removes all runs and turns of an interview. Used when the interview
    /// itself is deleted; historical runs of live interviews are never
    /// deleted.
    async fn delete_by_interview(&self, interview_id: &str) -> Result<()>;
}
