//! Cancelable asynchronous values.
//!
//! A [`Future<T, E>`] eventually holds either a value of type `T` or a
//! [`Rejection<E>`]. Continuations attached with [`Future::then`] and
//! friends return new, linked futures; canceling any of them cancels the
//! future it was derived from, all the way up to the source.
//!
//! # Deferred Dispatch
//!
//! Continuations never run inside the call that settles or subscribes.
//! Each future hands a dispatch pass to its [`Scheduler`]; with the
//! thread-local default scheduler,
//! [`run_microtasks`](crate::scheduler::run_microtasks) runs the passes.
//!
//! # Examples
//!
//! ## Chaining
//!
//! ```rust
//! use cancelable::future::Future;
//! use cancelable::scheduler::run_microtasks;
//!
//! let future: Future<i32, String> = Future::new(|settle, _| settle.resolve(1));
//! let next = future.then(|value| Ok(value + 1));
//!
//! run_microtasks();
//! assert_eq!(next.value(), Some(2));
//! ```
//!
//! ## Recovering From a Rejection
//!
//! ```rust
//! use cancelable::future::Future;
//! use cancelable::scheduler::run_microtasks;
//!
//! let future: Future<String, String> = Future::new(|_, fail| fail.reject("e".to_string()));
//! let recovered = future.catch(|rejection| Ok(format!("{rejection}!")));
//!
//! run_microtasks();
//! assert_eq!(recovered.value(), Some("e!".to_string()));
//! ```
//!
//! ## Upstream Cancellation
//!
//! ```rust
//! use cancelable::future::{Future, Rejection};
//!
//! let source: Future<i32, String> = Future::new(|_, _| {});
//! let derived = source.then(|value| Ok(value * 2));
//!
//! derived.cancel();
//!
//! assert!(source.is_canceled());
//! assert_eq!(source.rejection(), Some(Rejection::Canceled));
//! ```

mod continuation;
mod core;
mod resolver;
mod state;
mod thenable;

pub use continuation::{Continuation, Outcome};
pub use resolver::{Fail, Settle};
pub use state::{Rejection, State};
pub use thenable::{OnFulfilled, OnRejected, Resolution, Thenable};

use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

use self::continuation::{ContinuationRecord, Reaction};
use self::core::Shared;
use crate::error::{ConstructionError, ValidationError};
use crate::scheduler::{MicrotaskQueue, Scheduler};

/// A type-erased executor, as accepted by [`Future::from_any`].
pub type Executor<T, E> = Box<dyn FnOnce(Settle<T, E>, Fail<T, E>)>;

/// A type-erased fulfilled handler, as accepted by [`Future::then_any`].
pub type FulfilledFn<T, E> = Box<dyn FnOnce(T) -> Result<T, E>>;

/// A type-erased rejected handler, as accepted by [`Future::then_any`].
pub type RejectedFn<T, E> = Box<dyn FnOnce(Rejection<E>) -> Result<T, E>>;

/// A cancelable asynchronous value.
///
/// `Future` is a handle: cloning it yields another handle to the same
/// value. It is deliberately neither `Send` nor `Sync`; all futures of one
/// chain live in a single cooperative scheduling domain.
///
/// # Type Parameters
///
/// - `T`: The success value. Cloned once per subscriber.
/// - `E`: The failure value carried by [`Rejection`].
///
/// # Lifecycle
///
/// 1. Created `Pending`, by [`Future::new`] or by a chaining call.
/// 2. Settled at most once through [`Settle`] or [`Fail`]; later attempts
///    are ignored.
/// 3. [`Future::cancel`] may force `Rejected(Rejection::Canceled)` at any
///    point, overriding whatever outcome was recorded.
pub struct Future<T: 'static, E: 'static> {
    shared: Shared<T, E>,
}

impl<T: Clone + 'static, E: Clone + 'static> Future<T, E> {
    /// Creates a future on this thread's default [`MicrotaskQueue`].
    ///
    /// `executor` runs synchronously, exactly once, with the two settlement
    /// entry points. It may call either of them now, stash them for later,
    /// or drop both, leaving the future pending forever.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cancelable::future::Future;
    ///
    /// let future: Future<i32, String> = Future::new(|settle, _| settle.resolve(42));
    /// assert_eq!(future.value(), Some(42));
    /// ```
    pub fn new<X>(executor: X) -> Self
    where
        X: FnOnce(Settle<T, E>, Fail<T, E>),
    {
        Self::new_in(MicrotaskQueue::current(), executor)
    }

    /// Creates a future that dispatches on `scheduler`.
    pub fn new_in<S, X>(scheduler: S, executor: X) -> Self
    where
        S: Scheduler + 'static,
        X: FnOnce(Settle<T, E>, Fail<T, E>),
    {
        Self::with_scheduler(Rc::new(scheduler), executor)
    }

    fn with_scheduler<X>(scheduler: Rc<dyn Scheduler>, executor: X) -> Self
    where
        X: FnOnce(Settle<T, E>, Fail<T, E>),
    {
        let shared = Shared::new(scheduler);
        executor(Settle::new(shared.clone()), Fail::new(shared.clone()));
        Self { shared }
    }

    /// A future already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        Self::new(move |settle, _| settle.resolve(value))
    }

    /// [`Future::resolved`] on an explicit scheduler.
    pub fn resolved_in<S: Scheduler + 'static>(scheduler: S, value: T) -> Self {
        Self::new_in(scheduler, move |settle, _| settle.resolve(value))
    }

    /// A future already rejected with [`Rejection::Reason`].
    pub fn rejected(reason: E) -> Self {
        Self::new(move |_, fail| fail.reject(reason))
    }

    /// [`Future::rejected`] on an explicit scheduler.
    pub fn rejected_in<S: Scheduler + 'static>(scheduler: S, reason: E) -> Self {
        Self::new_in(scheduler, move |_, fail| fail.reject(reason))
    }

    /// Creates a future from an executor held as `Box<dyn Any>`.
    ///
    /// The box must contain an [`Executor<T, E>`].
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if it holds anything else. The error
    /// is reported synchronously and no future is created.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::any::Any;
    /// use cancelable::future::{Executor, Future};
    ///
    /// let executor: Executor<i32, String> = Box::new(|settle, _| settle.resolve(1));
    /// let future = Future::<i32, String>::from_any(Box::new(executor) as Box<dyn Any>);
    /// assert!(future.is_ok());
    ///
    /// let not_callable = Future::<i32, String>::from_any(Box::new(42) as Box<dyn Any>);
    /// assert!(not_callable.is_err());
    /// ```
    pub fn from_any(executor: Box<dyn Any>) -> Result<Self, ConstructionError> {
        let executor = executor
            .downcast::<Executor<T, E>>()
            .map_err(|_| ConstructionError {
                expected: type_name::<Executor<T, E>>(),
            })?;
        Ok(Self::new(*executor))
    }

    /// Subscribes a [`Continuation`] and returns the child future.
    ///
    /// The child is returned synchronously and settles on a later dispatch
    /// pass. It shares this future's scheduler, and canceling it cancels
    /// this future.
    pub fn subscribe<U>(&self, continuation: Continuation<T, U, E>) -> Future<U, E>
    where
        U: Clone + 'static,
    {
        let child = Shared::new(self.shared.scheduler());
        let record = ContinuationRecord::new(
            continuation,
            Settle::new(child.clone()),
            Fail::new(child.clone()),
        );
        child.set_cancel_hook(self.shared.upstream_hook());
        self.shared.push_reaction(Box::new(record));
        self.shared.schedule_dispatch();
        Future { shared: child }
    }

    /// Maps the value; rejections pass through to the child unchanged.
    ///
    /// Returning `Err` rejects the child with [`Rejection::Failed`].
    pub fn then<U, F>(&self, on_fulfilled: F) -> Future<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        self.subscribe(Continuation::on_fulfilled(on_fulfilled))
    }

    /// Handles both outcomes. Whatever `on_rejected` returns fulfills the
    /// child, so a rejection can be recovered.
    pub fn then_or_else<U, F, G>(&self, on_fulfilled: F, on_rejected: G) -> Future<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
        G: FnOnce(Rejection<E>) -> Result<U, E> + 'static,
    {
        self.subscribe(Continuation::on_fulfilled(on_fulfilled).with_rejected(on_rejected))
    }

    /// Like [`then`](Self::then), but the handler returns a thenable (for
    /// instance another future) that the child adopts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cancelable::future::Future;
    /// use cancelable::scheduler::run_microtasks;
    ///
    /// let future: Future<i32, String> = Future::resolved(20);
    /// let chained = future.and_then(|value| Ok(Future::resolved(value + 22)));
    ///
    /// run_microtasks();
    /// assert_eq!(chained.value(), Some(42));
    /// ```
    pub fn and_then<U, R, F>(&self, on_fulfilled: F) -> Future<U, E>
    where
        U: Clone + 'static,
        R: Thenable<U, E> + 'static,
        F: FnOnce(T) -> Result<R, E> + 'static,
    {
        self.subscribe(Continuation::adopting(on_fulfilled))
    }

    /// Handles a rejection; a value passes through to the child unchanged.
    pub fn catch<G>(&self, on_rejected: G) -> Self
    where
        G: FnOnce(Rejection<E>) -> Result<T, E> + 'static,
    {
        self.subscribe(Continuation::on_rejected(on_rejected))
    }

    /// Subscribes handlers held as `Box<dyn Any>`.
    ///
    /// Each present argument must contain a [`FulfilledFn<T, E>`] or a
    /// [`RejectedFn<T, E>`] respectively. An absent argument passes that
    /// outcome through.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first argument that holds
    /// anything else. Both arguments are checked before the child is
    /// created, so a failed call has no effect.
    pub fn then_any(
        &self,
        on_fulfilled: Option<Box<dyn Any>>,
        on_rejected: Option<Box<dyn Any>>,
    ) -> Result<Self, ValidationError> {
        let on_fulfilled = on_fulfilled
            .map(|handler| handler.downcast::<FulfilledFn<T, E>>())
            .transpose()
            .map_err(|_| ValidationError {
                argument: "on_fulfilled",
                expected: type_name::<FulfilledFn<T, E>>(),
            })?;
        let on_rejected = on_rejected
            .map(|handler| handler.downcast::<RejectedFn<T, E>>())
            .transpose()
            .map_err(|_| ValidationError {
                argument: "on_rejected",
                expected: type_name::<RejectedFn<T, E>>(),
            })?;
        Ok(self.subscribe(Continuation::from_parts(
            on_fulfilled.map(|handler| *handler),
            on_rejected.map(|handler| *handler),
        )))
    }

    /// Cancels this future and every future upstream of it, back to the
    /// source.
    ///
    /// The state is forced to `Rejected(Rejection::Canceled)` even if the
    /// future had already settled, and a dispatch pass is scheduled so
    /// queued continuations observe the cancellation.
    ///
    /// Futures derived from this one are not canceled: their
    /// [`is_canceled`](Self::is_canceled) stays `false`, and they only see
    /// [`Rejection::Canceled`] arriving through dispatch like any other
    /// rejection. Callers that need to know whether an ancestor was canceled
    /// should inspect the rejection rather than the flag.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> State<T, E> {
        self.shared.state()
    }

    /// The value, once fulfilled.
    pub fn value(&self) -> Option<T> {
        match self.state() {
            State::Fulfilled(value) => Some(value),
            State::Pending | State::Rejected(_) => None,
        }
    }

    /// The rejection, once rejected.
    pub fn rejection(&self) -> Option<Rejection<E>> {
        match self.state() {
            State::Rejected(rejection) => Some(rejection),
            State::Pending | State::Fulfilled(_) => None,
        }
    }
}

impl<T: 'static, E: 'static> Future<T, E> {
    /// Returns `true` once [`cancel`](Self::cancel) has been called on this
    /// future or on a future derived from it.
    pub fn is_canceled(&self) -> bool {
        self.shared.is_canceled()
    }

    /// Returns `true` while unsettled.
    pub fn is_pending(&self) -> bool {
        self.shared.is_pending()
    }

    /// Returns `true` once fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        self.shared.is_fulfilled()
    }

    /// Returns `true` once rejected (including by cancellation).
    pub fn is_rejected(&self) -> bool {
        self.shared.is_rejected()
    }
}

impl<T: 'static, E: 'static> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for Future<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Future")
            .field("id", &self.shared.id())
            .field("state", &self.shared.state_label())
            .field("canceled", &self.shared.is_canceled())
            .field("continuations", &self.shared.queued_continuations())
            .finish()
    }
}

/// Futures adopt futures: the adopting side follows this future's outcome
/// without installing a cancellation link.
impl<T: Clone + 'static, E: Clone + 'static> Thenable<T, E> for Future<T, E> {
    fn subscribe(self: Box<Self>, on_fulfilled: OnFulfilled<T, E>, on_rejected: OnRejected<E>) {
        self.shared.push_reaction(Box::new(Follower {
            on_fulfilled,
            on_rejected,
        }));
        self.shared.schedule_dispatch();
    }
}

/// Forwards an outcome to a pair of thenable callbacks.
struct Follower<T, E> {
    on_fulfilled: OnFulfilled<T, E>,
    on_rejected: OnRejected<E>,
}

impl<T, E> Reaction<T, E> for Follower<T, E> {
    fn react(self: Box<Self>, outcome: Result<T, Rejection<E>>, _is_canceled: &dyn Fn() -> bool) {
        match outcome {
            Ok(value) => (self.on_fulfilled)(Resolution::Value(value)),
            Err(rejection) => (self.on_rejected)(rejection),
        }
    }
}

static_assertions::assert_not_impl_any!(Future<i32, String>: Send, Sync);
static_assertions::assert_impl_all!(Future<i32, String>: Clone, fmt::Debug);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn debug_reports_state_and_queue() {
        let queue = MicrotaskQueue::new();
        let future: Future<i32, String> = Future::new_in(queue.clone(), |_, _| {});
        let _child = future.then(|value| Ok(value));

        let rendered = format!("{future:?}");
        assert!(rendered.contains("state: \"pending\""));
        assert!(rendered.contains("canceled: false"));
        assert!(rendered.contains("continuations: 1"));
    }

    #[rstest]
    fn child_shares_parent_scheduler() {
        let queue = MicrotaskQueue::new();
        let future: Future<i32, String> = Future::resolved_in(queue.clone(), 1);
        let child = future.then(|value| Ok(value + 1));

        assert!(!queue.is_empty());
        queue.run_until_idle();
        assert_eq!(child.value(), Some(2));
    }

    #[rstest]
    fn then_any_rejects_before_creating_child() {
        let queue = MicrotaskQueue::new();
        let future: Future<i32, String> = Future::new_in(queue.clone(), |_, _| {});

        let result = future.then_any(None, Some(Box::new("not a handler")));

        assert_eq!(
            result.map(|_| ()).map_err(|error| error.argument),
            Err("on_rejected")
        );
        assert!(queue.is_empty());
        assert!(format!("{future:?}").contains("continuations: 0"));
    }

    #[rstest]
    fn from_any_builds_a_future_from_boxed_executor() {
        let executor: Executor<i32, String> = Box::new(|settle, _| settle.resolve(3));
        let future = Future::<i32, String>::from_any(Box::new(executor));
        assert_eq!(future.map(|future| future.value()), Ok(Some(3)));
    }
}
