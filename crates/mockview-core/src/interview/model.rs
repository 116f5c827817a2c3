//! Interview domain model.
//!
//! An interview is one preparation context: the job description and CV
//! summaries it carries are passed to the question-generation collaborator
//! as opaque strings.

use crate::error::{MockviewError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum configurable interview duration in minutes.
pub const MIN_DURATION_MINUTES: u32 = 15;
/// Maximum configurable interview duration in minutes.
pub const MAX_DURATION_MINUTES: u32 = 60;

/// One interview preparation context owned by a single user.
///
/// An interview can be attempted multiple times; each attempt is a
/// [`SessionRun`](crate::session::SessionRun). Deleting an interview does not
/// rewrite historical runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    /// Unique interview identifier (UUID format)
    pub id: String,
    /// Verified external identity of the owner (opaque, trusted upstream)
    pub owner_id: String,
    /// Human-readable title
    pub title: String,
    /// Configured duration budget in minutes (bounded 15-60)
    pub duration_minutes: u32,
    /// Summarized job description, if one was ingested
    pub job_description: Option<String>,
    /// Summarized CV, if one was ingested
    pub cv_summary: Option<String>,
    /// Timestamp when the interview was created
    pub created_at: DateTime<Utc>,
}

impl Interview {
    /// Creates a new interview, validating the duration bounds.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        duration_minutes: u32,
    ) -> Result<Self> {
        validate_duration(duration_minutes)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            duration_minutes,
            job_description: None,
            cv_summary: None,
            created_at: Utc::now(),
        })
    }

    /// The configured wall-clock budget for one session run.
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Applies a partial update, validating the new duration if present.
    ///
    /// Validation happens before any field is written, so a rejected update
    /// leaves the interview untouched.
    pub fn apply(&mut self, update: InterviewUpdate) -> Result<()> {
        if let Some(duration_minutes) = update.duration_minutes {
            validate_duration(duration_minutes)?;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(duration_minutes) = update.duration_minutes {
            self.duration_minutes = duration_minutes;
        }
        if let Some(job_description) = update.job_description {
            self.job_description = Some(job_description);
        }
        if let Some(cv_summary) = update.cv_summary {
            self.cv_summary = Some(cv_summary);
        }
        Ok(())
    }
}

/// A partial update to an interview; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterviewUpdate {
    pub title: Option<String>,
    pub duration_minutes: Option<u32>,
    pub job_description: Option<String>,
    pub cv_summary: Option<String>,
}

fn validate_duration(duration_minutes: u32) -> Result<()> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(MockviewError::validation(format!(
            "duration_minutes must be between {} and {}, got {}",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, duration_minutes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_interview_validates_duration() {
        assert!(Interview::new("user-1", "Backend role", 30).is_ok());
        assert!(Interview::new("user-1", "Backend role", 14).is_err());
        assert!(Interview::new("user-1", "Backend role", 61).is_err());
        assert!(Interview::new("user-1", "Backend role", 15).is_ok());
        assert!(Interview::new("user-1", "Backend role", 60).is_ok());
    }

    #[test]
    fn test_apply_update() {
        let mut interview = Interview::new("user-1", "Backend role", 30).unwrap();
        interview
            .apply(InterviewUpdate {
                title: Some("Staff backend role".to_string()),
                duration_minutes: Some(45),
                job_description: Some("Rust services".to_string()),
                cv_summary: None,
            })
            .unwrap();

        assert_eq!(interview.title, "Staff backend role");
        assert_eq!(interview.duration_minutes, 45);
        assert_eq!(interview.job_description.as_deref(), Some("Rust services"));
        assert!(interview.cv_summary.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_duration_without_partial_write() {
        let mut interview = Interview::new("user-1", "Backend role", 30).unwrap();
        let err = interview.apply(InterviewUpdate {
            duration_minutes: Some(5),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(interview.duration_minutes, 30);
    }
}
