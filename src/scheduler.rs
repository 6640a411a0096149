//! Deferred execution of dispatch passes.
//!
//! A [`Future`](crate::future::Future) never runs continuations from inside
//! the call that settles it or subscribes to it. Instead it hands a
//! [`Microtask`] to its [`Scheduler`], which runs the task after the
//! current synchronous unit of work has finished.
//!
//! The crate ships one scheduler, [`MicrotaskQueue`], a single-threaded
//! FIFO queue. Every thread has a default queue reachable through
//! [`MicrotaskQueue::current`]; futures created with
//! [`Future::new`](crate::future::Future::new) use it, and
//! [`run_microtasks`] drains it.
//!
//! # Examples
//!
//! ```rust
//! use cancelable::future::Future;
//! use cancelable::scheduler::MicrotaskQueue;
//!
//! let queue = MicrotaskQueue::new();
//! let future: Future<i32, String> = Future::new_in(queue.clone(), |settle, _| settle.resolve(20));
//! let doubled = future.then(|value| Ok(value * 2));
//!
//! // Nothing has run yet
//! assert!(doubled.is_pending());
//!
//! queue.run_until_idle();
//! assert_eq!(doubled.value(), Some(40));
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A unit of deferred work.
pub type Microtask = Box<dyn FnOnce()>;

/// Something that can run a [`Microtask`] later.
///
/// # Contract
///
/// - `schedule` must not run the task synchronously.
/// - Tasks scheduled on the same scheduler run in the order they were
///   scheduled.
pub trait Scheduler {
    /// Queues `task` to run after the current synchronous unit completes.
    fn schedule(&self, task: Microtask);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule(&self, task: Microtask) {
        (**self).schedule(task);
    }
}

thread_local! {
    static CURRENT: MicrotaskQueue = MicrotaskQueue::new();
}

/// A single-threaded FIFO microtask queue.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
    tasks: Rc<RefCell<VecDeque<Microtask>>>,
}

impl MicrotaskQueue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to this thread's default queue.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Returns `true` if no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs the oldest queued task, if any.
    ///
    /// Returns `false` when the queue was empty.
    pub fn run_next(&self) -> bool {
        // The borrow must end before the task runs: tasks schedule more tasks.
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks until the queue is empty, including tasks scheduled while
    /// draining. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.run_next() {
            count += 1;
        }
        count
    }
}

impl Scheduler for MicrotaskQueue {
    fn schedule(&self, task: Microtask) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MicrotaskQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// Drains this thread's default queue. Returns the number of tasks run.
pub fn run_microtasks() -> usize {
    MicrotaskQueue::current().run_until_idle()
}
