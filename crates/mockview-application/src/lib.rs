//! Application layer for Mockview.
//!
//! Use-case orchestration on top of the core domain: the run controller
//! drives interview sessions end to end, the resolver decides resume versus
//! fresh start, the duration guard enforces the time limit, and the retry
//! policy shields both from transient generation failures.

pub mod duration_guard;
pub mod retry;
pub mod run_controller;
pub mod run_resolver;

pub use retry::RetryPolicy;
pub use run_controller::{AnswerOutcome, EndOutcome, HistoryView, RunController, StartedRun};
pub use run_resolver::{ResolvedStart, SessionRunResolver};
