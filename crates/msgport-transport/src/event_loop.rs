//! Single-threaded task queue that drives event delivery.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static CURRENT: EventLoop = EventLoop::new();
}

/// FIFO queue of delivery tasks.
///
/// Posting a message never runs listeners inline; it queues a task here.
/// Tasks run only from [`run_once`](Self::run_once) or
/// [`run_until_idle`](Self::run_until_idle), in the order they were queued.
#[derive(Clone, Default)]
pub struct EventLoop {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// The loop shared by everything created on this thread without an
    /// explicit loop.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    pub fn queue(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run the oldest queued task. Returns `false` when the queue was empty.
    pub fn run_once(&self) -> bool {
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until none remain, including tasks queued while running.
    ///
    /// Returns how many tasks ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0usize;
        while self.run_once() {
            ran = ran.saturating_add(1);
        }
        if ran > 0 {
            tracing::trace!(tasks = ran, "event loop idle");
        }
        ran
    }

    /// True when both handles drive the same queue.
    pub fn same_loop(&self, other: &EventLoop) -> bool {
        Rc::ptr_eq(&self.tasks, &other.tasks)
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending())
            .finish()
    }
}
