use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// Snapshot of worker pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub running: usize,
    pub waiting: usize,
    pub max_concurrent: usize,
}

/// Counts running jobs and parks the rest in FIFO order.
pub struct SlotQueue {
    max_concurrent: usize,
    running: usize,
    waiting: VecDeque<Arc<Notify>>,
}

impl SlotQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            running: 0,
            waiting: VecDeque::new(),
        }
    }

    /// Take a slot. `None` means the caller may run right away; otherwise it must
    /// wait on the returned handle, which is notified once a slot is handed over.
    pub fn try_acquire_slot(&mut self) -> Option<Arc<Notify>> {
        if self.running < self.max_concurrent {
            self.running += 1;
            None
        } else {
            let notify = Arc::new(Notify::new());
            self.waiting.push_back(notify.clone());
            Some(notify)
        }
    }

    /// Give a slot back, handing it straight to the oldest waiter if there is one.
    pub fn release_slot(&mut self) {
        self.running = self.running.saturating_sub(1);

        if let Some(waiting_job) = self.waiting.pop_front() {
            self.running += 1;
            waiting_job.notify_one();
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            running: self.running,
            waiting: self.waiting.len(),
            max_concurrent: self.max_concurrent,
        }
    }
}
