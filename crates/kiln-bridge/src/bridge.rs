//! The application-owned bridge facade.
//!
//! One [`BakeBridge`] instance owns the scheduler, the baker controller and
//! the setup data for a bake session. It is plain state passed to whoever
//! needs it; shutdown is an explicit call, not a process-exit side effect.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kiln_wire::IMMEDIATE_TEXTURE_SLOTS;
use tracing::{info, warn};

use crate::baker::{BakerController, WorkerHandle};
use crate::diag::{LogSink, Severity};
use crate::error::{LaunchError, TaskError};
use crate::scheduler::TaskScheduler;

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Session parameters handed over by the host at launch.
#[derive(Default)]
pub struct SetupData {
    /// The one-time scene snapshot, decoded by the worker at startup.
    pub snapshot: Vec<u8>,
    pub import_folder: Option<PathBuf>,
    pub export_folder: Option<PathBuf>,
    /// Shared-handle values of the baker's output targets, in slot order.
    pub target_handles: [i64; IMMEDIATE_TEXTURE_SLOTS],
}

impl SetupData {
    /// Accept a folder only if it exists on disk.
    pub fn checked_folder(path: &Path) -> Option<PathBuf> {
        if path.is_dir() {
            Some(path.to_path_buf())
        } else {
            warn!(path = %path.display(), "ignoring nonexistent exchange folder");
            None
        }
    }
}

pub struct BakeBridge {
    scheduler: Arc<TaskScheduler>,
    controller: BakerController,
    setup: SetupData,
    sink: Option<Arc<dyn LogSink>>,
}

impl BakeBridge {
    pub fn new(setup: SetupData) -> Self {
        Self {
            scheduler: Arc::new(TaskScheduler::new()),
            controller: BakerController::new(),
            setup,
            sink: None,
        }
    }

    pub fn setup(&self) -> &SetupData {
        &self.setup
    }

    pub fn setup_mut(&mut self) -> &mut SetupData {
        &mut self.setup
    }

    /// The worker clones this to pop tasks.
    pub fn scheduler(&self) -> Arc<TaskScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn set_log_sink(&mut self, sink: Arc<dyn LogSink>) {
        self.sink = Some(sink);
    }

    /// Bridge-level diagnostics: mirrored to the registered sink, if any.
    pub fn notify(&self, severity: Severity, message: &str) {
        if let Some(sink) = &self.sink {
            sink.log(severity, message);
        }
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Start the baker worker. The entry point receives the cooperative exit
    /// handle and the consumer side of the scheduler.
    pub fn launch_baker<F>(&mut self, entry: F) -> Result<(), LaunchError>
    where
        F: FnOnce(WorkerHandle, Arc<TaskScheduler>) + Send + 'static,
    {
        let scheduler = Arc::clone(&self.scheduler);
        info!("launching baker worker");
        self.controller
            .launch(move |handle| entry(handle, scheduler))
    }

    /// Producer side: validate and hand a delta to the worker. Rejected with
    /// a log while the worker is not running.
    pub fn push_task(&self, raw_kind: u32, payload: &[u8]) -> Result<(), TaskError> {
        if !self.controller.is_running() {
            warn!(
                raw = raw_kind,
                bytes = payload.len(),
                "rejecting task push while the baker is not running"
            );
            return Err(TaskError::NotRunning);
        }
        self.scheduler.push(raw_kind, payload)
    }

    /// Best-effort drain before shutdown: blocks the producer until the
    /// approximate queue length reads zero or the timeout elapses. The size
    /// is advisory under concurrent modification; this is not a correctness
    /// guarantee.
    pub fn flush(&self, timeout: Duration) -> bool {
        if !self.controller.is_running() {
            warn!("flush requested while the baker is not running");
            return false;
        }
        let deadline = Instant::now() + timeout;
        loop {
            if self.scheduler.approx_len() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(?timeout, "flush timed out with tasks still queued");
                return false;
            }
            thread::sleep(FLUSH_POLL_INTERVAL);
        }
    }

    /// Cooperative worker exit; see [`BakerController::request_exit`].
    pub fn request_exit(&mut self, timeout: Duration) -> bool {
        self.controller.request_exit(timeout)
    }

    /// Forced worker abandonment; see [`BakerController::force_exit`].
    pub fn force_exit(&mut self) {
        self.controller.force_exit()
    }

    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        self.controller.wait_for_exit(timeout)
    }

    /// Cooperative exit, then forced abandonment if the worker does not
    /// comply. Remaining queued tasks are released when the bridge drops.
    pub fn shutdown(&mut self, timeout: Duration) {
        if !self.controller.request_exit(timeout) {
            self.controller.force_exit();
        }
    }
}
