// core/scheduler.rs
//
// Deferred-task queue. Replaces timer chains: callers schedule a task at a
// wall-clock time and get a TaskId back; the engine drains due tasks at the
// start of every tick. Cancelling is by handle, never by ambient timer field.

/// Cancellation handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    id: TaskId,
    due_at: f64,
    task: T,
}

/// Queue of tasks ordered by due time, ties broken by scheduling order.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<Scheduled<T>>,
    next_id: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Schedule `task` to run at `due_at` (ms).
    pub fn schedule(&mut self, due_at: f64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Scheduled { id, due_at, task });
        id
    }

    /// Cancel a pending task. Returns false if it already ran or never existed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.tasks.iter().position(|s| s.id == id) {
            Some(idx) => {
                self.tasks.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove and return every task due at or before `now`, in due order.
    pub fn drain_due(&mut self, now: f64) -> Vec<(TaskId, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|s| s.due_at <= now);
        self.tasks = pending;
        due.sort_by(|a, b| a.due_at.total_cmp(&b.due_at).then(a.id.cmp(&b.id)));
        due.into_iter().map(|s| (s.id, s.task)).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
