//! Duration guard.
//!
//! Every open run is watched by one background task that ends the run once
//! the interview's configured duration has elapsed since the run started.
//! The deadline is anchored to the opening turn's stored timestamp, so a
//! process restart re-arms the guard with the original deadline rather than
//! granting extra time. The configured duration is re-read on every tick, so
//! updating an interview mid-run moves the deadline of its open run.

use crate::run_controller::{RunController, RunHandle};
use chrono::{DateTime, Utc};
use mockview_core::interview::Interview;
use mockview_core::session::{phase_of, run_started_at, RunPhase, SessionRun, Turn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn minutes_duration(minutes: u32) -> Duration {
    Duration::from_secs(u64::from(minutes) * 60)
}

impl RunController {
    /// Registers a handle for an open run and arms its duration guard.
    ///
    /// A no-op when the run is already ended or already loaded, so start and
    /// submit can both call this without spawning duplicate guards.
    pub(crate) async fn ensure_run_loaded(
        self: &Arc<Self>,
        run: &SessionRun,
        interview: &Interview,
        turns: &[Turn],
    ) {
        if phase_of(turns) == RunPhase::Ended {
            return;
        }
        let Some(started_at) = run_started_at(turns) else {
            return;
        };

        let mut active = self.active.write().await;
        if active.contains_key(&run.id) {
            return;
        }
        let handle = Arc::new(RunHandle {
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });
        active.insert(run.id.clone(), handle.clone());
        self.spawn_duration_guard(
            run.id.clone(),
            interview.clone(),
            started_at,
            handle.cancel.clone(),
        );
    }

    fn spawn_duration_guard(
        self: &Arc<Self>,
        run_id: String,
        interview: Interview,
        started_at: DateTime<Utc>,
        cancel: CancellationToken,
    ) {
        let controller = Arc::clone(self);
        let tick = self.guard_tick;

        tokio::spawn(async move {
            let remaining = (started_at + interview.duration() - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            let mut deadline = Instant::now() + remaining;
            let mut armed_minutes = interview.duration_minutes;
            tracing::debug!(
                target: "duration_guard",
                "Armed guard for run {} (fires in {:?})",
                run_id,
                remaining
            );

            let mut ticker = tokio::time::interval(tick);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!(
                            target: "duration_guard",
                            "Guard for run {} disarmed",
                            run_id
                        );
                        return;
                    }
                    _ = ticker.tick() => {
                        // A mid-run duration update moves the deadline; the
                        // anchor stays the opening turn's timestamp.
                        match controller.interviews.find_by_id(&interview.id).await {
                            Ok(Some(current)) if current.duration_minutes != armed_minutes => {
                                deadline = deadline
                                    - minutes_duration(armed_minutes)
                                    + minutes_duration(current.duration_minutes);
                                tracing::debug!(
                                    target: "duration_guard",
                                    "Run {} deadline moved: duration {} -> {} minutes",
                                    run_id,
                                    armed_minutes,
                                    current.duration_minutes
                                );
                                armed_minutes = current.duration_minutes;
                            }
                            Ok(Some(_)) => {}
                            Ok(None) => {
                                // Interview deleted mid-run; its runs are
                                // gone too, nothing left to end.
                                controller.unload_run(&run_id).await;
                                return;
                            }
                            Err(e) => {
                                tracing::warn!(
                                    target: "duration_guard",
                                    "Guard for run {} could not re-read interview: {}",
                                    run_id,
                                    e
                                );
                            }
                        }
                        if Instant::now() >= deadline {
                            break;
                        }
                    }
                }
            }

            tracing::info!(
                target: "duration_guard",
                "Run {} reached its duration limit, ending",
                run_id
            );
            if let Err(e) = controller.end_run_internal(&interview, &run_id).await {
                tracing::error!(
                    target: "duration_guard",
                    "Failed to end run {} at its deadline: {}",
                    run_id,
                    e
                );
            }
        });
    }
}
