//! Turn-taking state machine and transcript reconstruction.
//!
//! The conversational phase of a run is derived from its stored turn
//! sequence, never cached: the sequence is the source of truth. The
//! `AwaitingSystem` phase exists only while an answer is in flight and is
//! tracked by the application's per-run guard, because the stored sequence
//! transitions straight from one `AwaitingCandidate` to the next when the
//! paired turn commits.

use super::model::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The conversational phase of a session run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// The system has posed a question and the candidate has not answered it.
    AwaitingCandidate,
    /// A candidate answer has been accepted and the paired system turn has
    /// not yet been appended. Transient; never observable in storage.
    AwaitingSystem,
    /// The run carries a terminal turn. No further turns may be appended.
    Ended,
}

/// Who authored a visible transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    Interviewer,
    Candidate,
}

/// One visible line of a reconstructed conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub text: String,
    /// Feedback attached to the candidate's answer, carried on the candidate
    /// entry it evaluates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Derives the phase of a run from its ordered turn sequence.
///
/// An empty sequence is treated as `AwaitingCandidate`: the run exists but
/// its opening turn has not committed yet, and nothing has ended it.
pub fn phase_of(turns: &[Turn]) -> RunPhase {
    match turns.last() {
        Some(turn) if turn.is_terminal() => RunPhase::Ended,
        _ => RunPhase::AwaitingCandidate,
    }
}

/// The opening question of a run, i.e. the system message paired with the
/// `RUN_STARTED` sentinel.
pub fn opening_question(turns: &[Turn]) -> Option<&str> {
    turns
        .first()
        .filter(|turn| turn.is_opening())
        .map(|turn| turn.system_message.as_str())
}

/// The authoritative start time of a run: the timestamp of its opening
/// sentinel turn, not the run record's creation time.
pub fn run_started_at(turns: &[Turn]) -> Option<DateTime<Utc>> {
    turns
        .first()
        .filter(|turn| turn.is_opening())
        .map(|turn| turn.created_at)
}

/// The closing summary of an ended run, if one was generated.
pub fn closing_summary(turns: &[Turn]) -> Option<&str> {
    turns
        .last()
        .filter(|turn| turn.is_terminal())
        .and_then(|turn| turn.feedback.as_deref())
}

/// Reconstructs the visible transcript from a run's ordered turns.
///
/// Storage pairs "answer to the previous question" with "the next question"
/// in one record, so the visible order must flip each middle turn: candidate
/// message first, then the system message it triggered. The opening turn
/// contributes only its system message; the terminal turn contributes
/// nothing (its summary is surfaced separately).
pub fn reconstruct_transcript(turns: &[Turn]) -> Vec<TranscriptEntry> {
    let mut entries = Vec::new();

    for turn in turns {
        if turn.is_terminal() {
            continue;
        }
        if turn.is_opening() {
            entries.push(TranscriptEntry {
                role: TranscriptRole::Interviewer,
                text: turn.system_message.clone(),
                feedback: None,
            });
            continue;
        }
        entries.push(TranscriptEntry {
            role: TranscriptRole::Candidate,
            text: turn.candidate_message.clone(),
            feedback: turn.feedback.clone(),
        });
        entries.push(TranscriptEntry {
            role: TranscriptRole::Interviewer,
            text: turn.system_message.clone(),
            feedback: None,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::{RUN_ENDED, RUN_STARTED};

    fn opening(seq: u64, question: &str) -> Turn {
        Turn::new("run-1", seq, question, RUN_STARTED, None)
    }

    fn exchange(seq: u64, answer: &str, question: &str, feedback: Option<&str>) -> Turn {
        Turn::new(
            "run-1",
            seq,
            question,
            answer,
            feedback.map(str::to_string),
        )
    }

    fn terminal(seq: u64, summary: Option<&str>) -> Turn {
        Turn::new("run-1", seq, "", RUN_ENDED, summary.map(str::to_string))
    }

    #[test]
    fn test_phase_of_empty_and_open_runs() {
        assert_eq!(phase_of(&[]), RunPhase::AwaitingCandidate);
        let turns = vec![opening(0, "Tell me about yourself.")];
        assert_eq!(phase_of(&turns), RunPhase::AwaitingCandidate);
    }

    #[test]
    fn test_phase_of_ended_run() {
        let turns = vec![opening(0, "q"), terminal(1, None)];
        assert_eq!(phase_of(&turns), RunPhase::Ended);
    }

    #[test]
    fn test_transcript_pairs_candidate_before_system() {
        let turns = vec![
            opening(0, "Tell me about yourself."),
            exchange(1, "I built a cache", "How did you size it?", Some("solid")),
            exchange(2, "By working-set estimation", "What about eviction?", None),
        ];

        let transcript = reconstruct_transcript(&turns);
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript[0].role, TranscriptRole::Interviewer);
        assert_eq!(transcript[0].text, "Tell me about yourself.");
        assert_eq!(transcript[1].role, TranscriptRole::Candidate);
        assert_eq!(transcript[1].text, "I built a cache");
        assert_eq!(transcript[1].feedback.as_deref(), Some("solid"));
        assert_eq!(transcript[2].role, TranscriptRole::Interviewer);
        assert_eq!(transcript[2].text, "How did you size it?");
        assert_eq!(transcript[3].text, "By working-set estimation");
        assert_eq!(transcript[4].text, "What about eviction?");

        // Candidate never precedes their own question's answer in reverse:
        // every candidate entry is directly followed by an interviewer entry.
        for pair in transcript.windows(2) {
            if pair[0].role == TranscriptRole::Candidate {
                assert_eq!(pair[1].role, TranscriptRole::Interviewer);
            }
        }
    }

    #[test]
    fn test_terminal_turn_invisible_but_summary_readable() {
        let turns = vec![
            opening(0, "q1"),
            exchange(1, "a1", "q2", None),
            terminal(2, Some("Strong on systems design.")),
        ];

        let transcript = reconstruct_transcript(&turns);
        assert_eq!(transcript.len(), 3);
        assert!(transcript.iter().all(|e| e.text != RUN_ENDED));
        assert_eq!(
            closing_summary(&turns),
            Some("Strong on systems design.")
        );
    }

    #[test]
    fn test_opening_question_and_start_time() {
        let turns = vec![opening(0, "Walk me through your CV.")];
        assert_eq!(opening_question(&turns), Some("Walk me through your CV."));
        assert_eq!(run_started_at(&turns), Some(turns[0].created_at));
        assert_eq!(opening_question(&[]), None);
        assert_eq!(run_started_at(&[]), None);
    }
}
