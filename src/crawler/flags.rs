//! Process-lifetime coordination flags
//!
//! - run in progress: at most one run executes at a time
//! - urgent pending: sticky request consumed exactly once by the next run
//! - stop requested: one-way transition, never reset

use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct RunFlags {
    in_progress: AtomicBool,
    urgent: AtomicBool,
    stop: CancellationToken,
}

/// Holds the run-in-progress flag; releases it when dropped
#[derive(Debug)]
pub struct RunGuard<'a> {
    flags: &'a RunFlags,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flags.in_progress.store(false, Ordering::Release);
    }
}

impl RunFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as in progress, or returns `None` if one already is
    pub fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { flags: self })
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Registers an urgent request; `false` if one is already pending
    pub fn request_urgent(&self) -> bool {
        self.urgent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Consumes the pending urgent request, returning whether there was one
    pub fn take_urgent(&self) -> bool {
        self.urgent
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn urgent_pending(&self) -> bool {
        self.urgent.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Token cancelled once a stop has been requested
    pub fn token(&self) -> &CancellationToken {
        &self.stop
    }
}
