use thiserror::Error;

use crate::task::TaskKind;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid task kind {0:#x}")]
    InvalidKind(u32),

    #[error("{kind:?} task pushed with an empty payload")]
    EmptyPayload { kind: TaskKind },

    #[error("{kind:?} payload of {bytes} bytes is not a multiple of the {stride}-byte stride")]
    PayloadNotStrideMultiple {
        kind: TaskKind,
        bytes: usize,
        stride: usize,
    },

    #[error("{kind:?} payload of {bytes} bytes, expected exactly {expected}")]
    SettingPayloadSize {
        kind: TaskKind,
        bytes: usize,
        expected: usize,
    },

    /// Backpressure evidence, not a fatal error: the task was dropped and
    /// its payload released.
    #[error("task queue full, dropped {kind:?} task of {bytes} bytes")]
    QueueFull { kind: TaskKind, bytes: usize },

    #[error("the baker worker is not running")]
    NotRunning,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn the baker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
