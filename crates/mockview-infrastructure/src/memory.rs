//! In-memory repository and turn store implementations.
//!
//! Default backends for tests and embedded use. A single mutex per store
//! serializes every mutation, which also makes turn appends
//! ordering-preserving by construction.

use async_trait::async_trait;
use mockview_core::error::{MockviewError, Result};
use mockview_core::interview::{Interview, InterviewRepository};
use mockview_core::session::{SessionRun, Turn, TurnStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// In-memory interview repository backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryInterviewRepository {
    interviews: Mutex<HashMap<String, Interview>>,
}

impl MemoryInterviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InterviewRepository for MemoryInterviewRepository {
    async fn find_by_id(&self, interview_id: &str) -> Result<Option<Interview>> {
        let interviews = self.interviews.lock().unwrap();
        Ok(interviews.get(interview_id).cloned())
    }

    async fn save(&self, interview: &Interview) -> Result<()> {
        let mut interviews = self.interviews.lock().unwrap();
        interviews.insert(interview.id.clone(), interview.clone());
        Ok(())
    }

    async fn delete(&self, interview_id: &str) -> Result<()> {
        let mut interviews = self.interviews.lock().unwrap();
        interviews.remove(interview_id);
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Interview>> {
        let interviews = self.interviews.lock().unwrap();
        let mut owned: Vec<Interview> = interviews
            .values()
            .filter(|interview| interview.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

#[derive(Default)]
struct TurnStoreInner {
    runs: HashMap<String, SessionRun>,
    /// Turns per run, in append order.
    turns: HashMap<String, Vec<Turn>>,
}

/// In-memory turn store.
///
/// The store-wide atomic sequence counter guarantees a total turn order even
/// when two appends land within the same clock tick.
#[derive(Default)]
pub struct MemoryTurnStore {
    inner: Mutex<TurnStoreInner>,
    seq: AtomicU64,
}

impl MemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TurnStore for MemoryTurnStore {
    async fn create_run(&self, interview_id: &str) -> Result<SessionRun> {
        let run = SessionRun::new(interview_id);
        let mut inner = self.inner.lock().unwrap();
        inner.runs.insert(run.id.clone(), run.clone());
        inner.turns.insert(run.id.clone(), Vec::new());
        Ok(run)
    }

    async fn find_run(&self, session_run_id: &str) -> Result<Option<SessionRun>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.runs.get(session_run_id).cloned())
    }

    async fn append(
        &self,
        session_run_id: &str,
        system_message: &str,
        candidate_message: &str,
        feedback: Option<String>,
    ) -> Result<Turn> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.runs.contains_key(session_run_id) {
            return Err(MockviewError::not_found("session_run", session_run_id));
        }

        let turns = inner
            .turns
            .get(session_run_id)
            .ok_or_else(|| MockviewError::not_found("session_run", session_run_id))?;
        if turns.last().is_some_and(|turn| turn.is_terminal()) {
            return Err(MockviewError::run_terminated(session_run_id));
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let turn = Turn::new(
            session_run_id,
            seq,
            system_message,
            candidate_message,
            feedback,
        );

        if turn.is_terminal() {
            if let Some(run) = inner.runs.get_mut(session_run_id) {
                run.ended = true;
            }
        }
        inner
            .turns
            .get_mut(session_run_id)
            .expect("checked above")
            .push(turn.clone());
        Ok(turn)
    }

    async fn list_by_run(&self, session_run_id: &str) -> Result<Vec<Turn>> {
        let inner = self.inner.lock().unwrap();
        let turns = inner
            .turns
            .get(session_run_id)
            .ok_or_else(|| MockviewError::not_found("session_run", session_run_id))?;
        let mut turns = turns.clone();
        turns.sort_by_key(Turn::order_key);
        Ok(turns)
    }

    async fn list_by_interview(&self, interview_id: &str) -> Result<Vec<Turn>> {
        let inner = self.inner.lock().unwrap();
        let mut turns: Vec<Turn> = inner
            .runs
            .values()
            .filter(|run| run.interview_id == interview_id)
            .filter_map(|run| inner.turns.get(&run.id))
            .flatten()
            .cloned()
            .collect();
        turns.sort_by_key(Turn::order_key);
        Ok(turns)
    }

    async fn latest_for_interview(&self, interview_id: &str) -> Result<Option<Turn>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .runs
            .values()
            .filter(|run| run.interview_id == interview_id)
            .filter_map(|run| inner.turns.get(&run.id))
            .flatten()
            .max_by_key(|turn| turn.order_key())
            .cloned())
    }

    async fn delete_by_interview(&self, interview_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let run_ids: Vec<String> = inner
            .runs
            .values()
            .filter(|run| run.interview_id == interview_id)
            .map(|run| run.id.clone())
            .collect();
        for run_id in run_ids {
            inner.runs.remove(&run_id);
            inner.turns.remove(&run_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockview_core::session::{RUN_ENDED, RUN_STARTED};

    #[tokio::test]
    async fn test_append_rejects_unknown_run() {
        let store = MemoryTurnStore::new();
        let err = store
            .append("missing", "q", RUN_STARTED, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_append_rejects_terminated_run() {
        let store = MemoryTurnStore::new();
        let run = store.create_run("interview-1").await.unwrap();
        store
            .append(&run.id, "q1", RUN_STARTED, None)
            .await
            .unwrap();
        store.append(&run.id, "", RUN_ENDED, None).await.unwrap();

        let err = store
            .append(&run.id, "q2", "late answer", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MockviewError::RunTerminated { .. }));

        let run = store.find_run(&run.id).await.unwrap().unwrap();
        assert!(run.ended);
    }

    #[tokio::test]
    async fn test_ordering_is_total_per_run() {
        let store = MemoryTurnStore::new();
        let run = store.create_run("interview-1").await.unwrap();
        for i in 0..10 {
            store
                .append(&run.id, &format!("q{i}"), &format!("a{i}"), None)
                .await
                .unwrap();
        }
        let turns = store.list_by_run(&run.id).await.unwrap();
        assert_eq!(turns.len(), 10);
        for pair in turns.windows(2) {
            assert!(pair[0].order_key() < pair[1].order_key());
        }
    }

    #[tokio::test]
    async fn test_latest_for_interview_spans_runs() {
        let store = MemoryTurnStore::new();
        let run1 = store.create_run("interview-1").await.unwrap();
        let run2 = store.create_run("interview-1").await.unwrap();
        let other = store.create_run("interview-2").await.unwrap();

        store
            .append(&run1.id, "q1", RUN_STARTED, None)
            .await
            .unwrap();
        store
            .append(&other.id, "qx", RUN_STARTED, None)
            .await
            .unwrap();
        let last = store
            .append(&run2.id, "q2", RUN_STARTED, None)
            .await
            .unwrap();

        let latest = store.latest_for_interview("interview-1").await.unwrap();
        assert_eq!(latest.unwrap().id, last.id);
        assert!(store
            .latest_for_interview("interview-3")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_by_interview_removes_runs_and_turns() {
        let store = MemoryTurnStore::new();
        let run = store.create_run("interview-1").await.unwrap();
        store
            .append(&run.id, "q", RUN_STARTED, None)
            .await
            .unwrap();
        store.delete_by_interview("interview-1").await.unwrap();

        assert!(store.find_run(&run.id).await.unwrap().is_none());
        assert!(store
            .list_by_interview("interview-1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_interview_repository_round_trip() {
        let repo = MemoryInterviewRepository::new();
        let interview = Interview::new("user-1", "Backend role", 30).unwrap();
        repo.save(&interview).await.unwrap();

        let found = repo.find_by_id(&interview.id).await.unwrap().unwrap();
        assert_eq!(found, interview);

        let listed = repo.list_by_owner("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(repo.list_by_owner("user-2").await.unwrap().is_empty());

        repo.delete(&interview.id).await.unwrap();
        assert!(repo.find_by_id(&interview.id).await.unwrap().is_none());
    }
}
