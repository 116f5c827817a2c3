//! Question-generation collaborator contract.
//!
//! The actual generation backend (hosted LLM API, multi-agent framework,
//! canned scripts) lives behind this trait; the session subsystem only ever
//! sees questions, feedback, and summaries coming back. Routing between
//! models, prompt engineering, and RAG are configuration details of the
//! implementation, not part of this contract.

use crate::interview::Interview;
use crate::session::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Interview context handed to the generator with every call.
///
/// CV and job-description summaries are opaque strings supplied by the
/// document-ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewContext {
    pub title: String,
    pub duration_minutes: u32,
    pub job_description: Option<String>,
    pub cv_summary: Option<String>,
}

impl From<&Interview> for InterviewContext {
    fn from(interview: &Interview) -> Self {
        Self {
            title: interview.title.clone(),
            duration_minutes: interview.duration_minutes,
            job_description: interview.job_description.clone(),
            cv_summary: interview.cv_summary.clone(),
        }
    }
}

/// The opening question for a fresh run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedOpening {
    pub question: String,
}

/// The system's response to one candidate answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTurn {
    pub question: String,
    pub feedback: Option<String>,
}

/// A closing summary of the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub summary: String,
}

/// Errors surfaced by generation backends.
///
/// `Transient` failures (rate limits, upstream unavailability, timeouts) are
/// retried by the caller with bounded backoff; `Permanent` failures are
/// surfaced immediately.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("transient generation failure: {message}")]
    Transient {
        message: String,
        /// Upstream-suggested delay before retrying, when provided.
        retry_after: Option<Duration>,
    },
    #[error("permanent generation failure: {message}")]
    Permanent { message: String },
}

impl GenerationError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transient_with_retry_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::Transient {
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The upstream-suggested retry delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            Self::Permanent { .. } => None,
        }
    }
}

/// The external question-generation collaborator.
///
/// `history` is the raw stored turn sequence of the run, oldest first;
/// implementations decide how to render it into a prompt.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produces the opening question for a brand-new run.
    async fn generate_opening(
        &self,
        context: &InterviewContext,
    ) -> std::result::Result<GeneratedOpening, GenerationError>;

    /// Produces the next question (and optional feedback) after an answer.
    async fn generate_next(
        &self,
        context: &InterviewContext,
        history: &[Turn],
        answer: &str,
    ) -> std::result::Result<GeneratedTurn, GenerationError>;

    /// Produces a closing summary of the run so far.
    async fn generate_summary(
        &self,
        context: &InterviewContext,
        history: &[Turn],
    ) -> std::result::Result<GeneratedSummary, GenerationError>;
}
