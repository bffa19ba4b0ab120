//! Priority load scheduler with a per-tick icon budget
//!
//! Decouples "what needs loading" from "when it loads". Submission is cheap
//! and non-blocking; execution happens on the consumer thread inside
//! `run_tick`, capped so a long run of icon decodes can never eat a frame.
//! One min-ordered heap per category replaces the pop-many/push-back search
//! a single shared queue would need to let control tasks overtake icons.

use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

/// What kind of work a task carries. Only `Icon` counts against the
/// per-tick budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    /// Expensive icon decode-and-swap
    Icon,
    /// Small interactive work (config writes, cache flushes); never
    /// held back behind queued icons
    Control,
}

/// A unit of deferred work targeting one catalog entry.
///
/// Tasks reference entries by identifier, never by pointer; an entry deleted
/// while its task is queued simply makes the work a no-op.
pub struct LoadTask {
    pub target_id: u64,
    /// Lower value runs sooner
    pub priority: u8,
    pub category: TaskCategory,
    pub work: Box<dyn FnOnce() + Send>,
}

impl LoadTask {
    pub fn new(
        target_id: u64,
        priority: u8,
        category: TaskCategory,
        work: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            target_id,
            priority,
            category,
            work: Box::new(work),
        }
    }
}

/// Heap entry: ordered by ascending priority, then ascending submission
/// sequence (FIFO among equals).
struct Queued {
    priority: u8,
    seq: u64,
    task: LoadTask,
}

impl Queued {
    fn key(&self) -> (u8, u64) {
        (self.priority, self.seq)
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap is a max-heap; invert so the smallest key pops first
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.key().cmp(&self.key())
    }
}

struct Queues {
    icon: BinaryHeap<Queued>,
    control: BinaryHeap<Queued>,
    /// Monotone submission stamp, the FIFO tie-break
    seq: u64,
}

/// Frame-budgeted task queue. `submit` from any thread, `run_tick` once per
/// frame on the consumer thread.
pub struct LoadScheduler {
    queues: Mutex<Queues>,
    icon_budget: usize,
}

impl LoadScheduler {
    pub fn new(icon_budget: usize) -> Self {
        Self {
            queues: Mutex::new(Queues {
                icon: BinaryHeap::new(),
                control: BinaryHeap::new(),
                seq: 0,
            }),
            icon_budget,
        }
    }

    /// Enqueue a task. Non-blocking, O(log n).
    pub fn submit(&self, task: LoadTask) {
        let mut queues = self.queues.lock();
        let seq = queues.seq;
        queues.seq += 1;
        let queued = Queued {
            priority: task.priority,
            seq,
            task,
        };
        match queued.task.category {
            TaskCategory::Icon => queues.icon.push(queued),
            TaskCategory::Control => queues.control.push(queued),
        }
    }

    /// Execute queued work until the icon budget is spent and no control
    /// tasks remain. Icons over budget roll over to the next tick. The
    /// queue lock is released while each task runs.
    pub fn run_tick(&self) {
        let mut icons_run = 0usize;

        loop {
            let next = {
                let mut queues = self.queues.lock();
                let icon_allowed = icons_run < self.icon_budget;
                let take_icon = match (queues.icon.peek(), queues.control.peek()) {
                    (Some(i), Some(c)) => icon_allowed && i.key() <= c.key(),
                    (Some(_), None) => icon_allowed,
                    (None, _) => false,
                };
                if take_icon {
                    queues.icon.pop()
                } else {
                    queues.control.pop()
                }
            };

            let Some(queued) = next else { break };
            let category = queued.task.category;
            (queued.task.work)();
            if category == TaskCategory::Icon {
                icons_run += 1;
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        let queues = self.queues.lock();
        !queues.icon.is_empty() || !queues.control.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        let queues = self.queues.lock();
        queues.icon.len() + queues.control.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn recorder() -> (Arc<parking_lot::Mutex<Vec<u64>>>, impl Fn(u64, u8, TaskCategory) -> LoadTask) {
        let log: Arc<parking_lot::Mutex<Vec<u64>>> = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log2 = log.clone();
        let make = move |id: u64, priority: u8, category: TaskCategory| {
            let log = log2.clone();
            LoadTask::new(id, priority, category, move || log.lock().push(id))
        };
        (log, make)
    }

    #[test]
    fn drains_by_priority_then_submission_order() {
        let scheduler = LoadScheduler::new(16);
        let (log, task) = recorder();

        for (id, priority) in [(1u64, 2u8), (2, 1), (3, 0), (4, 1)] {
            scheduler.submit(task(id, priority, TaskCategory::Icon));
        }
        scheduler.run_tick();

        // priorities {2,1,0,1} drain as {0,1,1,2}, FIFO within priority 1
        assert_eq!(*log.lock(), vec![3, 2, 4, 1]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn icon_budget_caps_a_tick_and_rolls_over() {
        let scheduler = LoadScheduler::new(2);
        let (log, task) = recorder();

        for id in 1..=5u64 {
            scheduler.submit(task(id, 1, TaskCategory::Icon));
        }
        scheduler.submit(task(100, 1, TaskCategory::Control));

        scheduler.run_tick();
        // 2 icons + the control task ran; 3 icons wait for the next tick
        assert_eq!(*log.lock(), vec![1, 2, 100]);
        assert_eq!(scheduler.pending_count(), 3);

        scheduler.run_tick();
        assert_eq!(*log.lock(), vec![1, 2, 100, 3, 4]);
        scheduler.run_tick();
        assert_eq!(*log.lock(), vec![1, 2, 100, 3, 4, 5]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn control_tasks_never_starve_behind_icons() {
        let scheduler = LoadScheduler::new(1);
        let (log, task) = recorder();

        // a control task submitted last, at the worst priority, still runs
        // in the same tick once the icon budget is spent
        scheduler.submit(task(1, 0, TaskCategory::Icon));
        scheduler.submit(task(2, 0, TaskCategory::Icon));
        scheduler.submit(task(50, 2, TaskCategory::Control));

        scheduler.run_tick();
        assert_eq!(*log.lock(), vec![1, 50]);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn empty_tick_is_a_noop() {
        let scheduler = LoadScheduler::new(2);
        scheduler.run_tick();
        assert!(!scheduler.has_pending());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn submit_is_usable_across_threads() {
        let scheduler = Arc::new(LoadScheduler::new(64));
        let executed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let scheduler = scheduler.clone();
            let executed = executed.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..16u64 {
                    let executed = executed.clone();
                    scheduler.submit(LoadTask::new(i, 1, TaskCategory::Icon, move || {
                        executed.fetch_add(1, Ordering::Relaxed);
                    }));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        scheduler.run_tick();
        assert_eq!(executed.load(Ordering::Relaxed), 64);
    }
}
