//! Session domain module.
//!
//! - `model`: `SessionRun`, `Turn`, and the reserved sentinel values
//! - `turn_store`: append-only ledger trait for runs and turns
//! - `state_machine`: phase derivation and transcript reconstruction

mod model;
mod state_machine;
mod turn_store;

pub use model::{SessionRun, Turn, RUN_ENDED, RUN_STARTED};
pub use state_machine::{
    closing_summary, opening_question, phase_of, reconstruct_transcript, run_started_at,
    RunPhase, TranscriptEntry, TranscriptRole,
};
pub use turn_store::TurnStore;
