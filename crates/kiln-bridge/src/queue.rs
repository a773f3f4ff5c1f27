//! Bounded lock-free queue of bridge tasks.
//!
//! Single-producer / single-consumer: exactly one thread (the host) calls
//! [`TaskQueue::try_push`] and exactly one thread (the baker) calls
//! [`TaskQueue::try_pop`]. Neither side ever blocks; a full queue hands the
//! task back to the producer and an empty queue is a normal, frequent
//! condition the consumer polls.
//!
//! Cursors are free-running counters (wrapping, reduced modulo capacity on
//! use). A slot is published to the consumer only by the release store of
//! `tail`, and handed back to the producer only by the release store of
//! `head`, so a task is never observed half-written.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::task::BridgeTask;

/// Matches the original scheduler's fixed queue depth.
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct TaskQueue {
    slots: Box<[UnsafeCell<MaybeUninit<BridgeTask>>]>,
    /// Next slot to pop; advanced only by the consumer.
    head: AtomicUsize,
    /// Next slot to push; advanced only by the producer.
    tail: AtomicUsize,
}

// SAFETY: slot access is partitioned by the head/tail protocol above. The
// producer writes a slot strictly before publishing it via `tail`; the
// consumer reads a slot strictly before releasing it via `head`. With one
// producer and one consumer there is no concurrent access to any slot.
unsafe impl Send for TaskQueue {}
unsafe impl Sync for TaskQueue {}

impl TaskQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0);
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Producer side. A full queue returns the task to the caller unchanged.
    pub fn try_push(&self, task: BridgeTask) -> Result<(), BridgeTask> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) == self.slots.len() {
            return Err(task);
        }
        unsafe {
            (*self.slots[tail % self.slots.len()].get()).write(task);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Consumer side.
    pub fn try_pop(&self) -> Option<BridgeTask> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let task = unsafe {
            (*self.slots[head % self.slots.len()].get()).assume_init_read()
        };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(task)
    }

    /// Advisory length: approximate while the other side is active.
    pub fn approx_len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.approx_len() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        // Release every task that was pushed but never popped.
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskKind;

    fn task(tag: u8) -> BridgeTask {
        BridgeTask::new(TaskKind::DeleteNodes, &[tag, 0, 0, 0])
    }

    #[test]
    fn push_then_pop_returns_the_same_task() {
        let q = TaskQueue::with_capacity(4);
        q.try_push(task(1)).unwrap();
        let popped = q.try_pop().unwrap();
        assert_eq!(popped.kind(), TaskKind::DeleteNodes);
        assert_eq!(popped.payload(), &[1, 0, 0, 0]);
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn fifo_across_wraparound() {
        let q = TaskQueue::with_capacity(2);
        for round in 0..10u8 {
            q.try_push(task(round)).unwrap();
            q.try_push(task(round.wrapping_add(100))).unwrap();
            assert!(q.try_push(task(0)).is_err());
            assert_eq!(q.try_pop().unwrap().payload()[0], round);
            assert_eq!(q.try_pop().unwrap().payload()[0], round.wrapping_add(100));
        }
    }

    #[test]
    fn full_queue_hands_the_task_back() {
        let q = TaskQueue::with_capacity(1);
        q.try_push(task(1)).unwrap();
        let rejected = q.try_push(task(2)).unwrap_err();
        assert_eq!(rejected.payload()[0], 2);
        assert_eq!(q.approx_len(), 1);
    }

    #[test]
    fn dropping_the_queue_releases_pending_tasks() {
        let q = TaskQueue::with_capacity(8);
        for i in 0..5 {
            q.try_push(task(i)).unwrap();
        }
        drop(q); // must not leak or double-free
    }
}
