//! Directory-backed repository and turn store implementations.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! ├── interviews/
//! │   ├── <interview-id>.json
//! │   └── ...
//! └── runs/
//!     ├── <run-id>.json        (run metadata + its ordered turns)
//!     └── ...
//! ```
//!
//! Every write goes through a temp-file-and-rename so a crash mid-write
//! never leaves a truncated record behind.

use async_trait::async_trait;
use mockview_core::error::{MockviewError, Result};
use mockview_core::interview::{Interview, InterviewRepository};
use mockview_core::session::{SessionRun, Turn, TurnStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Directory-backed interview repository, one JSON file per interview.
pub struct DirInterviewRepository {
    interviews_dir: PathBuf,
}

impl DirInterviewRepository {
    /// Creates the repository, ensuring the directory exists.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let interviews_dir = base_dir.as_ref().join("interviews");
        fs::create_dir_all(&interviews_dir).await?;
        Ok(Self { interviews_dir })
    }

    fn path_for(&self, interview_id: &str) -> PathBuf {
        self.interviews_dir.join(format!("{interview_id}.json"))
    }
}

#[async_trait]
impl InterviewRepository for DirInterviewRepository {
    async fn find_by_id(&self, interview_id: &str) -> Result<Option<Interview>> {
        read_json(&self.path_for(interview_id)).await
    }

    async fn save(&self, interview: &Interview) -> Result<()> {
        let content = serde_json::to_vec_pretty(interview)?;
        write_atomic(&self.path_for(&interview.id), &content).await
    }

    async fn delete(&self, interview_id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(interview_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Interview>> {
        let mut owned = Vec::new();
        let mut entries = fs::read_dir(&self.interviews_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<Interview>(&entry.path()).await {
                Ok(Some(interview)) if interview.owner_id == owner_id => owned.push(interview),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: "storage", "Skipping unreadable interview file {:?}: {}", entry.path(), e);
                }
            }
        }
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

/// On-disk record for one session run: metadata plus its ordered turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunRecord {
    run: SessionRun,
    turns: Vec<Turn>,
}

/// Directory-backed turn store, one JSON file per run.
///
/// The store-wide sequence counter is recovered on startup by scanning the
/// highest persisted `seq`, so ordering stays total across restarts. A
/// single async mutex serializes the read-modify-write append path.
pub struct DirTurnStore {
    runs_dir: PathBuf,
    seq: AtomicU64,
    write_lock: tokio::sync::Mutex<()>,
}

impl DirTurnStore {
    /// Creates the store, ensuring the directory exists and recovering the
    /// sequence counter from persisted turns.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let runs_dir = base_dir.as_ref().join("runs");
        fs::create_dir_all(&runs_dir).await?;

        let store = Self {
            runs_dir,
            seq: AtomicU64::new(0),
            write_lock: tokio::sync::Mutex::new(()),
        };
        let max_seq = store
            .load_all()
            .await?
            .iter()
            .flat_map(|record| &record.turns)
            .map(|turn| turn.seq)
            .max();
        if let Some(max_seq) = max_seq {
            store.seq.store(max_seq + 1, Ordering::SeqCst);
        }
        Ok(store)
    }

    fn path_for(&self, session_run_id: &str) -> PathBuf {
        self.runs_dir.join(format!("{session_run_id}.json"))
    }

    async fn load_record(&self, session_run_id: &str) -> Result<Option<RunRecord>> {
        read_json(&self.path_for(session_run_id)).await
    }

    async fn store_record(&self, record: &RunRecord) -> Result<()> {
        let content = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.path_for(&record.run.id), &content).await
    }

    async fn load_all(&self) -> Result<Vec<RunRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.runs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<RunRecord>(&entry.path()).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "storage", "Skipping unreadable run file {:?}: {}", entry.path(), e);
                }
            }
        }
        Ok(records)
    }

    async fn records_for_interview(&self, interview_id: &str) -> Result<Vec<RunRecord>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|record| record.run.interview_id == interview_id)
            .collect())
    }
}

#[async_trait]
impl TurnStore for DirTurnStore {
    async fn create_run(&self, interview_id: &str) -> Result<SessionRun> {
        let _guard = self.write_lock.lock().await;
        let run = SessionRun::new(interview_id);
        self.store_record(&RunRecord {
            run: run.clone(),
            turns: Vec::new(),
        })
        .await?;
        Ok(run)
    }

    async fn find_run(&self, session_run_id: &str) -> Result<Option<SessionRun>> {
        Ok(self
            .load_record(session_run_id)
            .await?
            .map(|record| record.run))
    }

    async fn append(
        &self,
        session_run_id: &str,
        system_message: &str,
        candidate_message: &str,
        feedback: Option<String>,
    ) -> Result<Turn> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .load_record(session_run_id)
            .await?
            .ok_or_else(|| MockviewError::not_found("session_run", session_run_id))?;

        if record.turns.last().is_some_and(|turn| turn.is_terminal()) {
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
            record.run.ended = true;
        }
        record.turns.push(turn.clone());
        self.store_record(&record).await?;
        Ok(turn)
    }

    async fn list_by_run(&self, session_run_id: &str) -> Result<Vec<Turn>> {
        let mut record = self
            .load_record(session_run_id)
            .await?
            .ok_or_else(|| MockviewError::not_found("session_run", session_run_id))?;
        record.turns.sort_by_key(Turn::order_key);
        Ok(record.turns)
    }

    async fn list_by_interview(&self, interview_id: &str) -> Result<Vec<Turn>> {
        let mut turns: Vec<Turn> = self
            .records_for_interview(interview_id)
            .await?
            .into_iter()
            .flat_map(|record| record.turns)
            .collect();
        turns.sort_by_key(Turn::order_key);
        Ok(turns)
    }

    async fn latest_for_interview(&self, interview_id: &str) -> Result<Option<Turn>> {
        Ok(self
            .records_for_interview(interview_id)
            .await?
            .into_iter()
            .flat_map(|record| record.turns)
            .max_by_key(|turn| turn.order_key()))
    }

    async fn delete_by_interview(&self, interview_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        for record in self.records_for_interview(interview_id).await? {
            match fs::remove_file(self.path_for(&record.run.id)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
