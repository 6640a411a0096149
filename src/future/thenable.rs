//! Foreign asynchronous values.
//!
//! A [`Thenable`] is anything that can register a pair of callbacks and
//! later invoke exactly one of them. Settling a future with a thenable
//! makes the future *adopt* it: the future ends up in whatever state the
//! thenable eventually reports, flattening nested thenables on the way.
//!
//! Every [`Future`](super::Future) is a thenable, and so is any closure
//! with the right shape, which is how values from other callback-based
//! APIs are bridged in.
//!
//! # Examples
//!
//! ```rust
//! use cancelable::future::{Future, OnFulfilled, OnRejected, Resolution};
//! use cancelable::scheduler::MicrotaskQueue;
//!
//! let queue = MicrotaskQueue::new();
//! let future: Future<i32, String> = Future::new_in(queue.clone(), |settle, _| {
//!     // A foreign value that answers with another foreign value
//!     settle.adopt(|outer: OnFulfilled<i32, String>, _: OnRejected<String>| {
//!         outer(Resolution::adopt(|inner: OnFulfilled<i32, String>, _: OnRejected<String>| {
//!             inner(Resolution::Value(7));
//!         }));
//!     });
//! });
//!
//! queue.run_until_idle();
//! assert_eq!(future.value(), Some(7));
//! ```

use std::fmt;

use super::state::Rejection;

/// Callback a thenable invokes on success.
pub type OnFulfilled<T, E> = Box<dyn FnOnce(Resolution<T, E>)>;

/// Callback a thenable invokes on failure.
pub type OnRejected<E> = Box<dyn FnOnce(Rejection<E>)>;

/// A value that reports its outcome through registered callbacks.
///
/// # Contract
///
/// - Only the first callback invocation counts; later ones are ignored by
///   the adopting future.
/// - Either callback may be invoked synchronously from inside `subscribe`
///   or at any later point.
/// - Success may be reported with another thenable, which is adopted in
///   turn.
pub trait Thenable<T, E> {
    /// Registers the two callbacks.
    fn subscribe(self: Box<Self>, on_fulfilled: OnFulfilled<T, E>, on_rejected: OnRejected<E>);
}

impl<T, E, F> Thenable<T, E> for F
where
    F: FnOnce(OnFulfilled<T, E>, OnRejected<E>),
{
    fn subscribe(self: Box<Self>, on_fulfilled: OnFulfilled<T, E>, on_rejected: OnRejected<E>) {
        (*self)(on_fulfilled, on_rejected);
    }
}

/// What a future is settled with: a concrete value or something to adopt.
pub enum Resolution<T, E> {
    /// A concrete value; the future becomes fulfilled.
    Value(T),
    /// A foreign asynchronous value; the future follows it.
    Adopt(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    /// Wraps a thenable for adoption.
    pub fn adopt<R>(thenable: R) -> Self
    where
        R: Thenable<T, E> + 'static,
    {
        Self::Adopt(Box::new(thenable))
    }

    /// Returns `true` for [`Resolution::Adopt`].
    pub const fn is_adoptable(&self) -> bool {
        matches!(self, Self::Adopt(_))
    }
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => formatter.debug_tuple("Value").field(value).finish(),
            Self::Adopt(_) => formatter.write_str("Adopt(..)"),
        }
    }
}
