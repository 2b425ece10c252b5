//! Tick-boundary jitter
//!
//! Game actions land a sampled delay after the decision that produced
//! them, so reactions never align with the host's update cadence. A
//! single worker task executes delayed actions in order. At most one
//! normal action may be pending at a time; scheduling while one is in
//! flight is refused and the caller acts on a later tick instead.
//! Emergency actions jump the queue with a much shorter delay.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, Notify};
use tracing::trace;

use crate::activity::Severity;
use crate::core::config;
use crate::stats::distributions;

type Action = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    delay: Duration,
    cancelled: Arc<AtomicBool>,
    cancel_wake: Arc<Notify>,
    action: Action,
}

struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

pub struct TickJitterController {
    tx: mpsc::UnboundedSender<Job>,
    queued: Arc<AtomicU32>,
    current: Mutex<Option<CancelHandle>>,
}

impl TickJitterController {
    /// Must be called from within a tokio runtime; the worker task lives
    /// until the controller is dropped
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicU32::new(0));
        tokio::spawn(run_worker(rx, Arc::clone(&queued)));
        Self {
            tx,
            queued,
            current: Mutex::new(None),
        }
    }

    /// Sample a delay for an action of the given severity
    ///
    /// The Ex-Gaussian parameters shrink for urgent work and stretch for
    /// casual work; the clamp applies last, so every delay stays inside
    /// the configured window.
    pub fn sample_delay<R: Rng + ?Sized>(rng: &mut R, severity: Severity) -> Duration {
        let cfg = &config::config().jitter;
        let scale = severity.jitter_scale();
        let ms = distributions::ex_gaussian(
            rng,
            cfg.mu_ms * scale,
            cfg.sigma_ms * scale,
            cfg.tau_ms * scale,
        )
        .clamp(cfg.min_ms as f64, cfg.max_ms as f64);
        Duration::from_secs_f64(ms / 1000.0)
    }

    /// Queue `action` to run after `delay`
    ///
    /// Returns false without queueing if an action is already pending.
    pub fn schedule<F>(&self, delay: Duration, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self
            .queued
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("jitter slot occupied, action refused");
            return false;
        }
        if !self.submit(delay, Box::new(action)) {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Cancel whatever is pending and queue `action` behind a minimal
    /// delay, ignoring the one-pending rule
    pub fn schedule_emergency<R, F>(&self, rng: &mut R, action: F) -> bool
    where
        R: Rng + ?Sized,
        F: FnOnce() + Send + 'static,
    {
        self.cancel_pending();
        let cfg = &config::config().jitter;
        let delay = Duration::from_millis(rng.gen_range(cfg.emergency_min_ms..cfg.emergency_max_ms));
        self.queued.fetch_add(1, Ordering::AcqRel);
        if !self.submit(delay, Box::new(action)) {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Mark the most recently queued action cancelled; its slot frees
    /// once the worker observes the cancellation
    pub fn cancel_pending(&self) {
        let guard = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = guard.as_ref() {
            handle.cancelled.store(true, Ordering::Release);
            handle.wake.notify_one();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.queued.load(Ordering::Acquire) > 0
    }

    fn submit(&self, delay: Duration, action: Action) -> bool {
        let cancelled = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        {
            let mut guard = self
                .current
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = Some(CancelHandle {
                cancelled: Arc::clone(&cancelled),
                wake: Arc::clone(&wake),
            });
        }
        self.tx
            .send(Job {
                delay,
                cancelled,
                cancel_wake: wake,
                action,
            })
            .is_ok()
    }
}

impl Default for TickJitterController {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, queued: Arc<AtomicU32>) {
    while let Some(job) = rx.recv().await {
        tokio::select! {
            _ = tokio::time::sleep(job.delay) => {
                if !job.cancelled.load(Ordering::Acquire) {
                    (job.action)();
                }
            }
            _ = job.cancel_wake.notified() => {}
        }
        queued.fetch_sub(1, Ordering::AcqRel);
    }
}
