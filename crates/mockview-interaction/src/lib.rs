//! Interaction layer for Mockview.
//!
//! Question-generation backends behind the
//! [`QuestionGenerator`](mockview_core::generation::QuestionGenerator) trait:
//! the Claude REST API client and a deterministic scripted generator, plus
//! the interviewer prompt templates they share.

pub mod claude;
pub mod prompts;
pub mod scripted;

pub use claude::ClaudeGenerator;
pub use scripted::ScriptedGenerator;
