//! Session run and turn domain models.
//!
//! A session run is one attempt at conducting an interview. Its conversation
//! is an append-only sequence of turns; the first and last turns of a run use
//! reserved candidate-message sentinels to encode the start and end events.
//! The sentinels are a storage encoding only and are never accepted from, or
//! trusted as a signal by, clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved candidate-message value marking the opening turn of a run.
///
/// The timestamp of this turn is the authoritative run start time for the
/// duration guard (the `SessionRun` record may predate actual engagement).
pub const RUN_STARTED: &str = "RUN_STARTED";

/// Reserved candidate-message value marking the terminal turn of a run.
///
/// Its feedback field optionally carries the closing summary. Once present,
/// no further turns may be appended to the run.
pub const RUN_ENDED: &str = "RUN_ENDED";

/// One attempt at conducting an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRun {
    /// Unique run identifier (UUID format)
    pub id: String,
    /// The interview this run belongs to
    pub interview_id: String,
    /// Timestamp when the run record was created
    pub created_at: DateTime<Utc>,
    /// Termination marker, set when the terminal turn is appended
    #[serde(default)]
    pub ended: bool,
}

impl SessionRun {
    /// Creates a new, active run for the given interview.
    pub fn new(interview_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            interview_id: interview_id.into(),
            created_at: Utc::now(),
            ended: false,
        }
    }
}

/// One persisted exchange unit within a session run.
///
/// Storage pairs "answer to the previous question" with "the next question"
/// in a single record: `candidate_message` answers the question posed by the
/// *previous* turn, and `system_message` is the new question it triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn identifier (UUID format)
    pub id: String,
    /// The run this turn belongs to
    pub session_run_id: String,
    /// Store-wide monotonic sequence number; total order tie-break when
    /// two turns share a timestamp under clock skew
    pub seq: u64,
    /// Question or response authored by the system
    pub system_message: String,
    /// Candidate's answer, or one of the reserved sentinels
    pub candidate_message: String,
    /// Optional evaluative feedback on the candidate's answer
    pub feedback: Option<String>,
    /// Timestamp when the turn was appended
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Creates a turn with a fresh ID and the current timestamp.
    ///
    /// The store assigns `seq`; callers pass the value handed out by the
    /// store's ordering counter.
    pub fn new(
        session_run_id: impl Into<String>,
        seq: u64,
        system_message: impl Into<String>,
        candidate_message: impl Into<String>,
        feedback: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_run_id: session_run_id.into(),
            seq,
            system_message: system_message.into(),
            candidate_message: candidate_message.into(),
            feedback,
            created_at: Utc::now(),
        }
    }

    /// True if this is a run's opening sentinel turn.
    pub fn is_opening(&self) -> bool {
        self.candidate_message == RUN_STARTED
    }

    /// True if this is a run's terminal sentinel turn.
    pub fn is_terminal(&self) -> bool {
        self.candidate_message == RUN_ENDED
    }

    /// The total-order key for turns: creation timestamp, tie-broken by the
    /// store's sequence counter.
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_detection() {
        let opening = Turn::new("run-1", 0, "Tell me about yourself.", RUN_STARTED, None);
        assert!(opening.is_opening());
        assert!(!opening.is_terminal());

        let terminal = Turn::new("run-1", 1, "", RUN_ENDED, Some("Good session".into()));
        assert!(terminal.is_terminal());

        let regular = Turn::new("run-1", 2, "Next question?", "My answer", None);
        assert!(!regular.is_opening());
        assert!(!regular.is_terminal());
    }

    #[test]
    fn test_order_key_breaks_timestamp_ties() {
        let mut a = Turn::new("run-1", 1, "q1", RUN_STARTED, None);
        let mut b = Turn::new("run-1", 2, "q2", "answer", None);
        // Force identical timestamps to simulate clock-granularity collision
        let now = Utc::now();
        a.created_at = now;
        b.created_at = now;
        assert!(a.order_key() < b.order_key());
    }
}
