//! Session run resolver.
//!
//! Decides, on entering an interview, whether to resume the latest run or
//! start a fresh one, and obtains the opening question for fresh runs.

use crate::retry::RetryPolicy;
use mockview_core::error::{MockviewError, Result};
use mockview_core::generation::{InterviewContext, QuestionGenerator};
use mockview_core::interview::Interview;
use mockview_core::session::{SessionRun, Turn, TurnStore, RUN_STARTED};
use std::sync::Arc;

/// Outcome of resolving a start request.
pub enum ResolvedStart {
    /// The latest run is still open; replay its turns.
    Resumed { run: SessionRun, turns: Vec<Turn> },
    /// A fresh run was created with its opening sentinel turn.
    Fresh { run: SessionRun, opening: Turn },
}

/// Resolves start requests against the persisted turn history.
///
/// The resolver is queried fresh on every start; it is the single source of
/// truth for which run is current, so stale client-side run ids can never
/// fork a conversation.
pub struct SessionRunResolver {
    turn_store: Arc<dyn TurnStore>,
    generator: Arc<dyn QuestionGenerator>,
    retry: RetryPolicy,
}

impl SessionRunResolver {
    pub fn new(
        turn_store: Arc<dyn TurnStore>,
        generator: Arc<dyn QuestionGenerator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            turn_store,
            generator,
            retry,
        }
    }

    /// Resumes the interview's open run, or starts a new one.
    ///
    /// A run whose only turn is the opening sentinel is resumable, not new:
    /// reloading must yield the same run and the same opening question.
    ///
    /// # Errors
    ///
    /// `GenerationFailed` if the opening question cannot be generated; in
    /// that case nothing is persisted (the generation call happens before
    /// the run record is created).
    pub async fn start(&self, interview: &Interview) -> Result<ResolvedStart> {
        match self.turn_store.latest_for_interview(&interview.id).await? {
            Some(latest) if !latest.is_terminal() => {
                let run = self
                    .turn_store
                    .find_run(&latest.session_run_id)
                    .await?
                    .ok_or_else(|| {
                        MockviewError::internal(format!(
                            "turn {} references missing run {}",
                            latest.id, latest.session_run_id
                        ))
                    })?;
                let turns = self.turn_store.list_by_run(&run.id).await?;
                tracing::debug!(
                    target: "resolver",
                    "Resuming run {} for interview {} ({} turns)",
                    run.id,
                    interview.id,
                    turns.len()
                );
                Ok(ResolvedStart::Resumed { run, turns })
            }
            _ => self.start_fresh(interview).await,
        }
    }

    async fn start_fresh(&self, interview: &Interview) -> Result<ResolvedStart> {
        let context = InterviewContext::from(interview);
        // Generate before persisting anything: either both the run and its
        // opening turn exist afterwards, or neither does.
        let opening = self
            .retry
            .run("generate_opening", || {
                self.generator.generate_opening(&context)
            })
            .await?;

        let run = self.turn_store.create_run(&interview.id).await?;
        let turn = self
            .turn_store
            .append(&run.id, &opening.question, RUN_STARTED, None)
            .await?;
        tracing::info!(
            target: "resolver",
            "Started run {} for interview {}",
            run.id,
            interview.id
        );
        Ok(ResolvedStart::Fresh { run, opening: turn })
    }
}
