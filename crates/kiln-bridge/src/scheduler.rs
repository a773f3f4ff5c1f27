//! Task routing: validation, queueing and setting-change coalescing.
//!
//! Multi-element tasks go through the bounded queue as-is. Single-field
//! setting changes are not queued: the payload (a full [`GlobalSetting`]
//! image) overwrites one pending record, last write wins, and the change bit
//! is OR'ed into a sticky word. The consumer drains the sticky word one bit
//! per pop, highest bit first, each pop carrying a copy of the full current
//! record — redundant bytes, but trivially versioned.

use std::sync::{Mutex, MutexGuard};

use kiln_wire::{GlobalSetting, WireRecord};
use tracing::{error, warn};

use crate::error::TaskError;
use crate::queue::{TaskQueue, DEFAULT_CAPACITY};
use crate::task::{BridgeTask, TaskKind};

struct PendingSetting {
    blob: Box<[u8]>,
    /// Sticky word of setting-change bits observed since the last drain.
    changed: u32,
}

pub struct TaskScheduler {
    queue: TaskQueue,
    // Host-thread writes into the pending record are multi-field copies, so
    // they are guarded rather than relying on a bare memcpy being atomic.
    pending: Mutex<PendingSetting>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: TaskQueue::with_capacity(capacity),
            pending: Mutex::new(PendingSetting {
                blob: vec![0u8; GlobalSetting::SIZE].into_boxed_slice(),
                changed: 0,
            }),
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingSetting> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Producer side. Validates the (kind, payload) pair, then either queues
    /// it, coalesces it, or rejects it with the reason logged. Never blocks.
    pub fn push(&self, raw_kind: u32, payload: &[u8]) -> Result<(), TaskError> {
        let Some(kind) = TaskKind::from_raw(raw_kind) else {
            error!(raw = raw_kind, bytes = payload.len(), "invalid task kind");
            return Err(TaskError::InvalidKind(raw_kind));
        };
        if payload.is_empty() {
            error!(?kind, "task pushed with an empty payload");
            return Err(TaskError::EmptyPayload { kind });
        }

        match kind.stride() {
            None => {
                if payload.len() != GlobalSetting::SIZE {
                    error!(
                        ?kind,
                        bytes = payload.len(),
                        expected = GlobalSetting::SIZE,
                        "setting-change payload has the wrong size"
                    );
                    return Err(TaskError::SettingPayloadSize {
                        kind,
                        bytes: payload.len(),
                        expected: GlobalSetting::SIZE,
                    });
                }
                let mut pending = self.lock_pending();
                pending.blob.copy_from_slice(payload);
                pending.changed |= kind as u32;
                Ok(())
            }
            Some(stride) => {
                if payload.len() % stride != 0 {
                    error!(
                        ?kind,
                        bytes = payload.len(),
                        stride,
                        "task payload is not a stride multiple"
                    );
                    return Err(TaskError::PayloadNotStrideMultiple {
                        kind,
                        bytes: payload.len(),
                        stride,
                    });
                }
                self.queue
                    .try_push(BridgeTask::new(kind, payload))
                    .map_err(|rejected| {
                        warn!(
                            ?kind,
                            bytes = rejected.byte_len(),
                            capacity = self.queue.capacity(),
                            "task queue full, dropping task"
                        );
                        TaskError::QueueFull {
                            kind,
                            bytes: rejected.byte_len(),
                        }
                    })
            }
        }
    }

    /// Consumer side. Queued tasks first (FIFO); once the queue is empty,
    /// pending setting changes drain one bit per pop, highest bit first.
    pub fn pop(&self) -> Option<BridgeTask> {
        if let Some(task) = self.queue.try_pop() {
            return Some(task);
        }
        let mut pending = self.lock_pending();
        if pending.changed == 0 {
            return None;
        }
        let bit = 1u32 << (31 - pending.changed.leading_zeros());
        pending.changed &= !bit;
        // Only one-hot setting-change bits are ever recorded.
        let kind = TaskKind::from_raw(bit)?;
        Some(BridgeTask::new(kind, &pending.blob))
    }

    /// Advisory: queued tasks only, approximate under concurrent pushes.
    pub fn approx_len(&self) -> usize {
        self.queue.approx_len()
    }

    /// Whether coalesced setting changes are still waiting to be observed.
    pub fn has_pending_changes(&self) -> bool {
        self.lock_pending().changed != 0
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_wire::{Light, Transform};
    use pretty_assertions::assert_eq;

    fn setting_bytes(frame_width: i32) -> Vec<u8> {
        let mut setting = GlobalSetting::default();
        setting.frame_width = frame_width;
        let mut out = Vec::with_capacity(GlobalSetting::SIZE);
        setting.encode(&mut out);
        out
    }

    #[test]
    fn multi_element_push_pops_identically() {
        let scheduler = TaskScheduler::new();
        let mut payload = Vec::new();
        Transform::default().encode(&mut payload);
        Transform::default().encode(&mut payload);

        scheduler
            .push(TaskKind::UpdateTransforms as u32, &payload)
            .unwrap();
        let task = scheduler.pop().unwrap();
        assert_eq!(task.kind(), TaskKind::UpdateTransforms);
        assert_eq!(task.payload(), &payload[..]);
        assert_eq!(task.element_count(), 2);
        assert!(scheduler.pop().is_none());
    }

    #[test]
    fn non_stride_multiple_is_rejected_without_queueing() {
        let scheduler = TaskScheduler::new();
        let payload = vec![0u8; Light::SIZE + 1];
        let err = scheduler
            .push(TaskKind::UpdateLights as u32, &payload)
            .unwrap_err();
        assert!(matches!(err, TaskError::PayloadNotStrideMultiple { .. }));
        assert_eq!(scheduler.approx_len(), 0);
        assert!(scheduler.pop().is_none());
    }

    #[test]
    fn invalid_kind_and_empty_payload_are_rejected() {
        let scheduler = TaskScheduler::new();
        assert!(matches!(
            scheduler.push(0, &[0u8; 4]).unwrap_err(),
            TaskError::InvalidKind(0)
        ));
        assert!(matches!(
            scheduler
                .push(TaskKind::UpdateLights as u32, &[])
                .unwrap_err(),
            TaskError::EmptyPayload { .. }
        ));
    }

    #[test]
    fn four_setting_changes_drain_as_four_distinct_bits() {
        let scheduler = TaskScheduler::new();
        let kinds = [
            TaskKind::UpdateCamera,
            TaskKind::UpdateEnvironment,
            TaskKind::UpdateBounceCount,
            TaskKind::UpdateOneTransform,
        ];
        for (i, kind) in kinds.iter().enumerate() {
            scheduler
                .push(*kind as u32, &setting_bytes(i as i32))
                .unwrap();
        }
        // Not queued as discrete tasks.
        assert_eq!(scheduler.approx_len(), 0);
        assert!(scheduler.has_pending_changes());

        let mut seen = Vec::new();
        while let Some(task) = scheduler.pop() {
            assert!(task.kind().is_setting_change());
            // Every pop carries the full latest record.
            let setting = task.decode_setting().unwrap();
            assert_eq!(setting.frame_width, 3);
            seen.push(task.kind());
        }
        seen.sort_by_key(|k| *k as u32);
        let mut expected = kinds.to_vec();
        expected.sort_by_key(|k| *k as u32);
        assert_eq!(seen, expected);
        assert!(!scheduler.has_pending_changes());
    }

    #[test]
    fn repeated_pushes_of_one_field_collapse_into_one_pop() {
        let scheduler = TaskScheduler::new();
        for width in [100, 200, 300] {
            scheduler
                .push(TaskKind::UpdateCamera as u32, &setting_bytes(width))
                .unwrap();
        }
        let task = scheduler.pop().unwrap();
        assert_eq!(task.kind(), TaskKind::UpdateCamera);
        assert_eq!(task.decode_setting().unwrap().frame_width, 300);
        assert!(scheduler.pop().is_none());
    }

    #[test]
    fn queued_tasks_drain_before_coalesced_changes() {
        let scheduler = TaskScheduler::new();
        scheduler
            .push(TaskKind::UpdateCamera as u32, &setting_bytes(1))
            .unwrap();
        let mut payload = Vec::new();
        Light::default().encode(&mut payload);
        scheduler
            .push(TaskKind::UpdateLights as u32, &payload)
            .unwrap();

        assert_eq!(scheduler.pop().unwrap().kind(), TaskKind::UpdateLights);
        assert_eq!(scheduler.pop().unwrap().kind(), TaskKind::UpdateCamera);
        assert!(scheduler.pop().is_none());
    }
}
