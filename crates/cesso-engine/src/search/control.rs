//! Search control — stop flag and time management.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Controls when a search should stop.
///
/// Checked periodically by the search (every 2048 nodes) to decide whether
/// to abort. Supports two modes:
/// - **Infinite**: no time pressure, only responds to the external stop flag
/// - **Timed**: clock starts immediately (`go wtime/btime`, `go movetime`)
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    clock_active: bool,
    start: Mutex<Option<Instant>>,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    soft_scale: AtomicI32,
    node_limit: Option<u64>,
}

impl SearchControl {
    /// Create control for `go infinite` or a bare `go` — no time limits.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self {
            stopped,
            clock_active: false,
            start: Mutex::new(None),
            soft_limit: None,
            hard_limit: None,
            soft_scale: AtomicI32::new(100),
            node_limit: None,
        }
    }

    /// Create control with time limits; the clock starts immediately.
    pub fn new_timed(stopped: Arc<AtomicBool>, soft: Duration, hard: Duration) -> Self {
        Self {
            stopped,
            clock_active: true,
            start: Mutex::new(Some(Instant::now())),
            soft_limit: Some(soft),
            hard_limit: Some(hard),
            soft_scale: AtomicI32::new(100),
            node_limit: None,
        }
    }

    /// Attach a hard node budget (`go nodes N`), checked alongside the clock.
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// Check whether the search should abort immediately.
    ///
    /// Returns `true` if the external stop flag is set, the node budget is
    /// exhausted, or the clock is active and the hard limit has been
    /// exceeded (checked every 2048 nodes). When a limit fires, the stop
    /// flag is latched so subsequent calls return immediately without
    /// re-checking the clock.
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if nodes & 2047 != 0 {
            return false;
        }

        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.stopped.store(true, Ordering::Release);
            return true;
        }

        if !self.clock_active {
            return false;
        }

        if let Some(hard) = self.hard_limit
            && self.elapsed() >= hard
        {
            self.stopped.store(true, Ordering::Release);
            return true;
        }

        false
    }

    /// Update the soft-limit scaling factor (in hundredths).
    ///
    /// 100 = neutral (1.0x), 60 = play faster, 180 = think longer.
    pub fn update_soft_scale(&self, scale_hundredths: i32) {
        self.soft_scale.store(scale_hundredths, Ordering::Relaxed);
    }

    /// Check whether iterative deepening should start a new iteration.
    ///
    /// The effective soft limit is `soft * soft_scale / 100`, clamped to the
    /// hard limit so stability scaling can never exceed the hard budget.
    pub fn should_stop_iterating(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if !self.clock_active {
            return false;
        }

        if let Some(soft) = self.soft_limit {
            let scale = self.soft_scale.load(Ordering::Relaxed);
            let effective_ms = (soft.as_millis() as i64 * scale as i64 / 100) as u64;
            let mut effective = Duration::from_millis(effective_ms);

            if let Some(hard) = self.hard_limit {
                effective = effective.min(hard);
            }

            return self.elapsed() >= effective;
        }

        false
    }

    /// Elapsed time since the clock started. [`Duration::ZERO`] if inactive.
    pub fn elapsed(&self) -> Duration {
        self.start
            .lock()
            .expect("start mutex poisoned")
            .map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Reference to the shared stop flag.
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}
