//! Baker worker lifecycle.
//!
//! One background thread runs the baking entry point. The producer drives it
//! through `Idle -> Starting -> Running -> ExitRequested -> Idle`; the
//! worker itself reports liveness. Cancellation comes in two tiers with
//! different contracts: [`BakerController::request_exit`] is cooperative and
//! waits for the worker to observe the flag; [`BakerController::force_exit`]
//! abandons the worker immediately and skips its cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::LaunchError;

/// How long a re-entrant launch waits for the previous worker before
/// abandoning it.
const RELAUNCH_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakerState {
    Idle,
    Starting,
    Running,
    ExitRequested,
}

struct WorkerShared {
    state: Mutex<BakerState>,
    exited: Condvar,
    /// Worker liveness, written only by the worker (and by forced abandon).
    /// Kept separate from `exit_requested` so a liveness query never races
    /// against a flag the worker has not observed yet.
    running: AtomicBool,
    exit_requested: AtomicBool,
}

impl WorkerShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(BakerState::Starting),
            exited: Condvar::new(),
            running: AtomicBool::new(false),
            exit_requested: AtomicBool::new(false),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BakerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Handed to the worker entry point.
#[derive(Clone)]
pub struct WorkerHandle {
    shared: Arc<WorkerShared>,
}

impl WorkerHandle {
    /// Cooperative exit flag, polled by the worker at its own granularity.
    pub fn exit_requested(&self) -> bool {
        self.shared.exit_requested.load(Ordering::Acquire)
    }
}

/// Clears liveness and wakes waiters when the worker returns or unwinds.
struct RunGuard {
    shared: Arc<WorkerShared>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        *self.shared.lock_state() = BakerState::Idle;
        self.shared.exited.notify_all();
    }
}

pub struct BakerController {
    current: Option<Arc<WorkerShared>>,
}

impl BakerController {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn state(&self) -> BakerState {
        match &self.current {
            Some(shared) => *shared.lock_state(),
            None => BakerState::Idle,
        }
    }

    /// Pure liveness query: whether the worker body is executing. This reads
    /// the worker-maintained flag, never the cooperative exit flag.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|shared| shared.running.load(Ordering::Acquire))
    }

    /// Spawn the worker thread, detached. A launch while a worker is still
    /// up drives a full exit first; two workers never run concurrently.
    pub fn launch<F>(&mut self, entry: F) -> Result<(), LaunchError>
    where
        F: FnOnce(WorkerHandle) + Send + 'static,
    {
        if self.is_running() {
            warn!("baker already running, driving a full exit before relaunch");
            if !self.request_exit(RELAUNCH_EXIT_TIMEOUT) {
                self.force_exit();
            }
        }

        let shared = Arc::new(WorkerShared::new());
        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("kiln-baker".into())
            .spawn(move || {
                let guard = RunGuard {
                    shared: Arc::clone(&worker_shared),
                };
                {
                    // Transition under the state lock so an exit requested
                    // during startup is either observed here or strictly
                    // after Running is published.
                    let mut state = worker_shared.lock_state();
                    if worker_shared.exit_requested.load(Ordering::Acquire) {
                        debug!("exit requested before the baker started");
                        return;
                    }
                    worker_shared.running.store(true, Ordering::Release);
                    *state = BakerState::Running;
                }
                entry(WorkerHandle {
                    shared: Arc::clone(&guard.shared),
                });
            })?;
        self.current = Some(shared);
        Ok(())
    }

    /// Cooperative exit: a no-op from `Idle`; otherwise sets the exit flag
    /// and blocks until the worker reports not-running or the timeout
    /// elapses. Returns whether the worker exited.
    pub fn request_exit(&mut self, timeout: Duration) -> bool {
        let Some(shared) = self.current.clone() else {
            debug!("exit requested while idle, nothing to do");
            return true;
        };

        let mut state = shared.lock_state();
        shared.exit_requested.store(true, Ordering::Release);
        if *state == BakerState::Idle {
            drop(state);
            self.current = None;
            return true;
        }
        *state = BakerState::ExitRequested;

        let (state, timed_out) = shared
            .exited
            .wait_timeout_while(state, timeout, |state| *state != BakerState::Idle)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(state);

        if timed_out.timed_out() {
            warn!(?timeout, "baker did not exit within the timeout");
            false
        } else {
            self.current = None;
            true
        }
    }

    /// Forced exit: abandons the worker without giving it a chance to
    /// release resources. The controller stops tracking it immediately.
    pub fn force_exit(&mut self) {
        let Some(shared) = self.current.take() else {
            debug!("forced exit while idle, nothing to do");
            return;
        };
        shared.exit_requested.store(true, Ordering::Release);
        error!("baker thread terminated forcefully, resource cleanup was skipped");
    }

    /// Block until the current worker exits or the timeout elapses.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let Some(shared) = &self.current else {
            return true;
        };
        let state = shared.lock_state();
        let (_guard, timed_out) = shared
            .exited
            .wait_timeout_while(state, timeout, |state| *state != BakerState::Idle)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !timed_out.timed_out()
    }
}

impl Default for BakerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn spin_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn request_exit_from_idle_is_a_nonblocking_noop() {
        let mut controller = BakerController::new();
        let start = std::time::Instant::now();
        assert!(controller.request_exit(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!controller.is_running());
        assert_eq!(controller.state(), BakerState::Idle);
    }

    #[test]
    fn worker_runs_until_cooperative_exit() {
        let mut controller = BakerController::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let worker_ticks = Arc::clone(&ticks);
        controller
            .launch(move |handle| {
                while !handle.exit_requested() {
                    worker_ticks.fetch_add(1, Ordering::Relaxed);
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();

        assert!(spin_until(Duration::from_secs(5), || controller.is_running()));
        assert!(spin_until(Duration::from_secs(5), || ticks
            .load(Ordering::Relaxed)
            > 0));
        assert!(controller.request_exit(Duration::from_secs(5)));
        assert!(!controller.is_running());
    }

    #[test]
    fn forced_exit_abandons_the_worker_immediately() {
        let mut controller = BakerController::new();
        controller
            .launch(|handle| {
                while !handle.exit_requested() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();
        assert!(spin_until(Duration::from_secs(5), || controller.is_running()));
        controller.force_exit();
        assert!(!controller.is_running());
        assert_eq!(controller.state(), BakerState::Idle);
    }

    #[test]
    fn relaunch_drives_the_previous_worker_out() {
        let mut controller = BakerController::new();
        let generation = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let worker_generation = Arc::clone(&generation);
            controller
                .launch(move |handle| {
                    worker_generation.store(expected, Ordering::SeqCst);
                    while !handle.exit_requested() {
                        thread::sleep(Duration::from_millis(1));
                    }
                })
                .unwrap();
            assert!(spin_until(Duration::from_secs(5), || generation
                .load(Ordering::SeqCst)
                == expected));
        }

        assert!(controller.request_exit(Duration::from_secs(5)));
    }
}
