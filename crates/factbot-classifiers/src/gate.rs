//! Quiescence gate for conversation context resets
//!
//! Classification calls read and append to each stage's conversation without
//! holding a global lock. A reset must not swap the conversation out from
//! under them, so it first closes the gate to new admissions, waits for the
//! in-flight count to reach zero, reloads, and then reopens the gate.
//!
//! The admission check and the counter increment happen under the same mutex
//! that `reset` uses to raise its flag, so no call can slip in between the flag
//! being raised and the reload finishing.

use factbot_telemetry::metrics::names;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Default interval after which a waiting reset reports a stalled drain
pub const DEFAULT_DRAIN_WARN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct GateState {
    in_flight: usize,
    resetting: bool,
}

/// Result of a [`QuiescenceGate::reset`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// This caller drained the gate and ran the reload
    Completed,
    /// Another reset was already running; nothing was done
    AlreadyRunning,
}

/// Point-in-time view of the gate
#[derive(Debug, Clone, Serialize)]
pub struct GateStatus {
    pub in_flight: usize,
    pub resetting: bool,
    pub drain_stalled: bool,
    pub resets_completed: u64,
}

/// Admission counter with a drain-before-reload barrier
pub struct QuiescenceGate {
    state: Mutex<GateState>,
    drained: Notify,
    drain_warn_interval: Duration,
    drain_stalled: AtomicBool,
    resets_completed: AtomicU64,
}

impl QuiescenceGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::with_drain_warn_interval(DEFAULT_DRAIN_WARN_INTERVAL)
    }

    /// Create an open gate with a custom stall reporting interval
    pub fn with_drain_warn_interval(drain_warn_interval: Duration) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            drained: Notify::new(),
            drain_warn_interval,
            drain_stalled: AtomicBool::new(false),
            resets_completed: AtomicU64::new(0),
        }
    }

    /// Admit one classification call.
    ///
    /// Returns `None` while a reset is in progress. The returned guard
    /// releases the admission when dropped, on every exit path.
    pub fn try_admit(&self) -> Option<Admission<'_>> {
        let mut state = self.state.lock();
        if state.resetting {
            return None;
        }
        state.in_flight += 1;
        metrics::gauge!(names::GATE_IN_FLIGHT).set(state.in_flight as f64);
        Some(Admission { gate: self })
    }

    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.in_flight > 0, "admission released twice");
        state.in_flight = state.in_flight.saturating_sub(1);
        metrics::gauge!(names::GATE_IN_FLIGHT).set(state.in_flight as f64);
        let wake = state.in_flight == 0 && state.resetting;
        drop(state);

        if wake {
            self.drained.notify_waiters();
        }
    }

    /// Number of admitted calls not yet released
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub fn is_resetting(&self) -> bool {
        self.state.lock().resetting
    }

    /// Whether the running reset has waited past the stall interval
    pub fn is_drain_stalled(&self) -> bool {
        self.drain_stalled.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> GateStatus {
        let state = self.state.lock();
        GateStatus {
            in_flight: state.in_flight,
            resetting: state.resetting,
            drain_stalled: self.drain_stalled.load(Ordering::Relaxed),
            resets_completed: self.resets_completed.load(Ordering::Relaxed),
        }
    }

    /// Close the gate, wait for quiescence, run `reload`, reopen.
    ///
    /// A caller arriving while another reset is running returns
    /// [`ResetOutcome::AlreadyRunning`] at once. There is no upper bound on the
    /// drain: a call that never completes keeps admissions blocked, which is
    /// reported through logs and the stall gauge rather than papered over.
    pub async fn reset<F, Fut>(&self, reload: F) -> ResetOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let in_flight = {
            let mut state = self.state.lock();
            if state.resetting {
                debug!("reset already in progress");
                return ResetOutcome::AlreadyRunning;
            }
            state.resetting = true;
            state.in_flight
        };
        let _flag = ResetFlag { gate: self };
        metrics::gauge!(names::GATE_RESETTING).set(1.0);

        info!(in_flight, "reset started, draining in-flight classifications");
        let started = Instant::now();
        self.wait_for_quiescence().await;
        debug!(waited_ms = started.elapsed().as_millis() as u64, "gate drained");

        reload().await;

        self.resets_completed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(names::RESETS_TOTAL).increment(1);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reset complete, admissions reopened"
        );
        ResetOutcome::Completed
    }

    async fn wait_for_quiescence(&self) {
        let started = Instant::now();
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                break;
            }

            if tokio::time::timeout(self.drain_warn_interval, notified)
                .await
                .is_err()
            {
                self.drain_stalled.store(true, Ordering::Relaxed);
                metrics::gauge!(names::GATE_DRAIN_STALLED).set(1.0);
                warn!(
                    in_flight = self.in_flight(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "reset drain stalled, admissions remain blocked"
                );
            }
        }

        if self.drain_stalled.swap(false, Ordering::Relaxed) {
            metrics::gauge!(names::GATE_DRAIN_STALLED).set(0.0);
        }
    }
}

impl Default for QuiescenceGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped admission; releases on drop
#[must_use = "dropping the admission releases it immediately"]
pub struct Admission<'a> {
    gate: &'a QuiescenceGate,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Clears the reset flag however the reset future ends
struct ResetFlag<'a> {
    gate: &'a QuiescenceGate,
}

impl Drop for ResetFlag<'_> {
    fn drop(&mut self) {
        self.gate.state.lock().resetting = false;
        metrics::gauge!(names::GATE_RESETTING).set(0.0);
    }
}
