//! Session run controller.
//!
//! The use-case layer tying the resolver, the turn store, the generator, and
//! the duration guard together. One controller serves every interview; state
//! per loaded run is limited to an in-flight marker and the guard task's
//! cancellation token, because the stored turn sequence is the source of
//! truth for everything else.

use crate::retry::RetryPolicy;
use crate::run_resolver::{ResolvedStart, SessionRunResolver};
use mockview_core::config::GuardConfig;
use mockview_core::error::{MockviewError, Result};
use mockview_core::generation::{InterviewContext, QuestionGenerator};
use mockview_core::interview::{Interview, InterviewRepository};
use mockview_core::session::{
    closing_summary, opening_question, phase_of, reconstruct_transcript, RunPhase, SessionRun,
    TranscriptEntry, TurnStore, RUN_ENDED, RUN_STARTED,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Result of entering an interview.
#[derive(Debug, Clone, Serialize)]
pub struct StartedRun {
    pub session_run_id: String,
    pub opening_question: String,
    pub transcript: Vec<TranscriptEntry>,
    /// True when an open run was resumed instead of created.
    pub resumed: bool,
}

/// Result of one accepted candidate answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub session_run_id: String,
    pub system_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Result of ending a run. Repeated ends return the same summary.
#[derive(Debug, Clone, Serialize)]
pub struct EndOutcome {
    pub session_run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// The reconstructed visible transcript of one run.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub session_run_id: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Per-loaded-run state: the single-writer marker and the guard's
/// cancellation token.
pub(crate) struct RunHandle {
    pub(crate) in_flight: AtomicBool,
    pub(crate) cancel: CancellationToken,
}

/// Resets the in-flight marker when the submit path unwinds, error or not.
struct InFlightReset<'a>(&'a AtomicBool);

impl Drop for InFlightReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates the interview session lifecycle.
pub struct RunController {
    pub(crate) interviews: Arc<dyn InterviewRepository>,
    turn_store: Arc<dyn TurnStore>,
    generator: Arc<dyn QuestionGenerator>,
    resolver: SessionRunResolver,
    retry: RetryPolicy,
    pub(crate) guard_tick: Duration,
    /// Handles for runs currently loaded, keyed by run id.
    pub(crate) active: RwLock<HashMap<String, Arc<RunHandle>>>,
}

impl RunController {
    pub fn new(
        interviews: Arc<dyn InterviewRepository>,
        turn_store: Arc<dyn TurnStore>,
        generator: Arc<dyn QuestionGenerator>,
        retry: RetryPolicy,
        guard: &GuardConfig,
    ) -> Self {
        Self {
            interviews: interviews.clone(),
            turn_store: turn_store.clone(),
            generator: generator.clone(),
            resolver: SessionRunResolver::new(turn_store, generator, retry),
            retry,
            guard_tick: guard.tick(),
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Loads an interview, hiding interviews of other owners as not found.
    pub async fn require_interview(&self, owner_id: &str, interview_id: &str) -> Result<Interview> {
        match self.interviews.find_by_id(interview_id).await? {
            Some(interview) if interview.owner_id == owner_id => Ok(interview),
            _ => Err(MockviewError::not_found("interview", interview_id)),
        }
    }

    /// Enters an interview: resumes the open run or starts a fresh one, and
    /// arms the duration guard for the run.
    pub async fn start(self: &Arc<Self>, owner_id: &str, interview_id: &str) -> Result<StartedRun> {
        let interview = self.require_interview(owner_id, interview_id).await?;

        let (run, turns, resumed) = match self.resolver.start(&interview).await? {
            ResolvedStart::Resumed { run, turns } => (run, turns, true),
            ResolvedStart::Fresh { run, opening } => (run, vec![opening], false),
        };

        let question = opening_question(&turns)
            .ok_or_else(|| {
                MockviewError::internal(format!("run {} has no opening turn", run.id))
            })?
            .to_string();

        self.ensure_run_loaded(&run, &interview, &turns).await;

        Ok(StartedRun {
            session_run_id: run.id,
            opening_question: question,
            transcript: reconstruct_transcript(&turns),
            resumed,
        })
    }

    /// Accepts one candidate answer and produces the paired system turn.
    ///
    /// At most one answer may be in flight per run; a second concurrent
    /// submission is rejected with `OutOfTurn`. On generation failure
    /// nothing is appended and the run stays awaiting the candidate, so the
    /// same answer can safely be resubmitted.
    pub async fn submit_answer(
        self: &Arc<Self>,
        owner_id: &str,
        interview_id: &str,
        session_run_id: Option<&str>,
        text: &str,
    ) -> Result<AnswerOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MockviewError::validation("answer text must not be empty"));
        }
        if text == RUN_STARTED || text == RUN_ENDED {
            // Reserved storage encoding, never accepted as candidate speech.
            return Err(MockviewError::validation("answer uses a reserved value"));
        }

        let interview = self.require_interview(owner_id, interview_id).await?;
        let run = self
            .resolve_target_run(interview_id, session_run_id, true)
            .await?;
        let turns = self.turn_store.list_by_run(&run.id).await?;
        if phase_of(&turns) == RunPhase::Ended {
            return Err(MockviewError::run_terminated(&run.id));
        }

        self.ensure_run_loaded(&run, &interview, &turns).await;
        let handle = self.handle_for(&run.id).await.ok_or_else(|| {
            MockviewError::internal(format!("run {} not loaded after ensure", run.id))
        })?;

        // Single-writer discipline: the marker is only cleared once the
        // paired turn has been appended (or the attempt has failed).
        if handle
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MockviewError::out_of_turn(&run.id));
        }
        let _reset = InFlightReset(&handle.in_flight);

        // Re-read under the marker: a submit or end that completed between
        // the first read and the marker acquisition must be visible in the
        // history handed to the generator.
        let turns = self.turn_store.list_by_run(&run.id).await?;
        if phase_of(&turns) == RunPhase::Ended {
            return Err(MockviewError::run_terminated(&run.id));
        }

        let context = InterviewContext::from(&interview);
        let generated = self
            .retry
            .run("generate_next", || {
                self.generator.generate_next(&context, &turns, text)
            })
            .await?;

        // If the duration guard ended the run while the answer was being
        // generated, this append fails with RunTerminated: the deadline wins.
        let turn = self
            .turn_store
            .append(&run.id, &generated.question, text, generated.feedback)
            .await?;

        Ok(AnswerOutcome {
            session_run_id: run.id,
            system_message: turn.system_message,
            feedback: turn.feedback,
        })
    }

    /// Ends a run, appending the terminal turn with a best-effort summary.
    ///
    /// Idempotent: ending an already-ended run returns the stored summary
    /// and appends nothing, which also resolves the race between a client
    /// end and the duration guard firing.
    pub async fn end(
        self: &Arc<Self>,
        owner_id: &str,
        interview_id: &str,
        session_run_id: Option<&str>,
    ) -> Result<EndOutcome> {
        let interview = self.require_interview(owner_id, interview_id).await?;
        let run = self
            .resolve_target_run(interview_id, session_run_id, false)
            .await?;
        self.end_run_internal(&interview, &run.id).await
    }

    pub(crate) async fn end_run_internal(
        &self,
        interview: &Interview,
        run_id: &str,
    ) -> Result<EndOutcome> {
        let turns = self.turn_store.list_by_run(run_id).await?;
        if phase_of(&turns) == RunPhase::Ended {
            let outcome = EndOutcome {
                session_run_id: run_id.to_string(),
                summary: closing_summary(&turns).map(str::to_string),
            };
            self.unload_run(run_id).await;
            return Ok(outcome);
        }

        // Best effort: a run terminates whether or not a summary could be
        // generated.
        let context = InterviewContext::from(interview);
        let summary = match self
            .retry
            .run("generate_summary", || {
                self.generator.generate_summary(&context, &turns)
            })
            .await
        {
            Ok(generated) => Some(generated.summary),
            Err(e) => {
                tracing::warn!(
                    target: "session",
                    "Ending run {} without summary: {}",
                    run_id,
                    e
                );
                None
            }
        };

        let summary = match self
            .turn_store
            .append(run_id, "", RUN_ENDED, summary.clone())
            .await
        {
            Ok(_) => summary,
            Err(MockviewError::RunTerminated { .. }) => {
                // Lost the race with a concurrent end; report the winner's
                // summary.
                let turns = self.turn_store.list_by_run(run_id).await?;
                closing_summary(&turns).map(str::to_string)
            }
            Err(e) => return Err(e),
        };

        self.unload_run(run_id).await;
        tracing::info!(target: "session", "Run {} ended", run_id);
        Ok(EndOutcome {
            session_run_id: run_id.to_string(),
            summary,
        })
    }

    /// Reconstructs the visible transcript of a run (the latest one when no
    /// run id is given). An interview with no runs yields an empty view.
    pub async fn history(
        &self,
        owner_id: &str,
        interview_id: &str,
        session_run_id: Option<&str>,
    ) -> Result<HistoryView> {
        self.require_interview(owner_id, interview_id).await?;

        let run = match session_run_id {
            Some(run_id) => Some(self.require_run(interview_id, run_id).await?),
            None => match self.turn_store.latest_for_interview(interview_id).await? {
                Some(latest) => self.turn_store.find_run(&latest.session_run_id).await?,
                None => None,
            },
        };

        let Some(run) = run else {
            return Ok(HistoryView {
                session_run_id: None,
                transcript: Vec::new(),
                ended: false,
                summary: None,
            });
        };

        let turns = self.turn_store.list_by_run(&run.id).await?;
        Ok(HistoryView {
            session_run_id: Some(run.id),
            ended: phase_of(&turns) == RunPhase::Ended,
            summary: closing_summary(&turns).map(str::to_string),
            transcript: reconstruct_transcript(&turns),
        })
    }

    async fn require_run(&self, interview_id: &str, run_id: &str) -> Result<SessionRun> {
        match self.turn_store.find_run(run_id).await? {
            Some(run) if run.interview_id == interview_id => Ok(run),
            _ => Err(MockviewError::not_found("session_run", run_id)),
        }
    }

    /// Resolves the run a request targets.
    ///
    /// With no explicit id, the interview's most recent run is used. With an
    /// explicit id and `must_be_current`, a run superseded by a newer one is
    /// rejected as terminated: a stale tab must not keep writing to an old
    /// conversation.
    async fn resolve_target_run(
        &self,
        interview_id: &str,
        session_run_id: Option<&str>,
        must_be_current: bool,
    ) -> Result<SessionRun> {
        let latest = self.turn_store.latest_for_interview(interview_id).await?;

        match session_run_id {
            Some(run_id) => {
                let run = self.require_run(interview_id, run_id).await?;
                if must_be_current {
                    if let Some(latest) = &latest {
                        if latest.session_run_id != run.id {
                            return Err(MockviewError::run_terminated(run_id));
                        }
                    }
                }
                Ok(run)
            }
            None => {
                let latest =
                    latest.ok_or_else(|| MockviewError::not_found("session_run", interview_id))?;
                self.require_run(interview_id, &latest.session_run_id).await
            }
        }
    }

    pub(crate) async fn handle_for(&self, run_id: &str) -> Option<Arc<RunHandle>> {
        let active = self.active.read().await;
        active.get(run_id).cloned()
    }

    pub(crate) async fn unload_run(&self, run_id: &str) {
        let mut active = self.active.write().await;
        if let Some(handle) = active.remove(run_id) {
            handle.cancel.cancel();
        }
    }
}
