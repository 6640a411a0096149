//! Continuation records and the per-future continuation queue.
//!
//! A [`Continuation`] is the user-facing `(on_fulfilled, on_rejected)` pair.
//! Subscribing it to a future pairs it with the child future's settlement
//! entry points, producing a [`ContinuationRecord`], which the parent keeps
//! type-erased in its [`ContinuationQueue`] until its next dispatch pass.
//!
//! # Invariants
//!
//! - **FIFO Order**: reactions are handed out in registration order
//! - **Drain Once**: [`ContinuationQueue::take`] leaves the queue empty, so
//!   no reaction is ever invoked twice

use std::panic::{AssertUnwindSafe, catch_unwind};

use smallvec::SmallVec;

use super::resolver::{Fail, Settle};
use super::state::Rejection;
use super::thenable::{Resolution, Thenable};
use crate::trace_compat::debug;

/// Result of running a continuation handler. `Err` is the Rust rendition of
/// a handler that threw.
pub type Outcome<U, E> = Result<Resolution<U, E>, E>;

type FulfilledHandler<T, U, E> = Box<dyn FnOnce(T) -> Outcome<U, E>>;
type RejectedHandler<U, E> = Box<dyn FnOnce(Rejection<E>) -> Outcome<U, E>>;

enum FulfilledArm<T, U, E> {
    /// No handler: the value goes to the child unchanged.
    PassThrough(fn(T) -> U),
    Handler(FulfilledHandler<T, U, E>),
}

/// An `(on_fulfilled, on_rejected)` pair to subscribe to a
/// [`Future`](super::Future).
///
/// Either handler may be absent. An absent fulfilled handler passes the
/// value through (only possible when the child has the parent's value
/// type); an absent rejected handler passes the rejection through.
///
/// # Examples
///
/// ```rust
/// use cancelable::future::{Continuation, Future};
/// use cancelable::scheduler::MicrotaskQueue;
///
/// let queue = MicrotaskQueue::new();
/// let future: Future<i32, String> = Future::rejected_in(queue.clone(), "e".to_string());
///
/// let continuation: Continuation<i32, String, String> =
///     Continuation::on_fulfilled(|value: i32| Ok(value.to_string()))
///         .with_rejected(|rejection| Ok(format!("{rejection}!")));
/// let child = future.subscribe(continuation);
///
/// queue.run_until_idle();
/// assert_eq!(child.value(), Some("e!".to_string()));
/// ```
pub struct Continuation<T, U, E> {
    on_fulfilled: FulfilledArm<T, U, E>,
    on_rejected: Option<RejectedHandler<U, E>>,
}

impl<T: 'static, U: 'static, E: 'static> Continuation<T, U, E> {
    /// A continuation that maps the value; rejections pass through.
    pub fn on_fulfilled<F>(handler: F) -> Self
    where
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        Self {
            on_fulfilled: FulfilledArm::Handler(Box::new(move |value| {
                handler(value).map(Resolution::Value)
            })),
            on_rejected: None,
        }
    }

    /// A continuation whose handler returns a thenable for the child to adopt.
    pub fn adopting<F, R>(handler: F) -> Self
    where
        F: FnOnce(T) -> Result<R, E> + 'static,
        R: Thenable<U, E> + 'static,
    {
        Self {
            on_fulfilled: FulfilledArm::Handler(Box::new(move |value| {
                handler(value).map(Resolution::adopt)
            })),
            on_rejected: None,
        }
    }

    /// Adds (or replaces) the rejected handler. Its result fulfills the
    /// child, so a rejection can be recovered.
    #[must_use]
    pub fn with_rejected<G>(mut self, handler: G) -> Self
    where
        G: FnOnce(Rejection<E>) -> Result<U, E> + 'static,
    {
        self.on_rejected = Some(Box::new(move |rejection| {
            handler(rejection).map(Resolution::Value)
        }));
        self
    }
}

impl<T: 'static, E: 'static> Continuation<T, T, E> {
    /// A continuation with neither handler: the child mirrors the parent.
    pub fn pass_through() -> Self {
        Self {
            on_fulfilled: FulfilledArm::PassThrough(std::convert::identity),
            on_rejected: None,
        }
    }

    /// A continuation with only a rejected handler; values pass through.
    pub fn on_rejected<G>(handler: G) -> Self
    where
        G: FnOnce(Rejection<E>) -> Result<T, E> + 'static,
    {
        Self::pass_through().with_rejected(handler)
    }

    /// Builds a continuation from optional boxed handlers.
    pub(crate) fn from_parts(
        on_fulfilled: Option<Box<dyn FnOnce(T) -> Result<T, E>>>,
        on_rejected: Option<Box<dyn FnOnce(Rejection<E>) -> Result<T, E>>>,
    ) -> Self {
        let continuation = match on_fulfilled {
            Some(handler) => Self::on_fulfilled(handler),
            None => Self::pass_through(),
        };
        match on_rejected {
            Some(handler) => continuation.with_rejected(handler),
            None => continuation,
        }
    }
}

/// Something a settled future notifies during dispatch.
///
/// # Contract
///
/// - `react` is called at most once (enforced by `self: Box<Self>`)
/// - `is_canceled` reports the parent's cancellation flag at the moment it
///   is called
pub(crate) trait Reaction<T, E> {
    fn react(self: Box<Self>, outcome: Result<T, Rejection<E>>, is_canceled: &dyn Fn() -> bool);
}

/// A subscribed continuation together with the child's entry points.
pub(crate) struct ContinuationRecord<T, U: 'static, E: 'static> {
    continuation: Continuation<T, U, E>,
    settle_child: Settle<U, E>,
    fail_child: Fail<U, E>,
}

impl<T, U: 'static, E: 'static> ContinuationRecord<T, U, E> {
    pub(crate) const fn new(
        continuation: Continuation<T, U, E>,
        settle_child: Settle<U, E>,
        fail_child: Fail<U, E>,
    ) -> Self {
        Self {
            continuation,
            settle_child,
            fail_child,
        }
    }
}

impl<T, U, E> Reaction<T, E> for ContinuationRecord<T, U, E>
where
    U: Clone + 'static,
    E: Clone + 'static,
{
    fn react(self: Box<Self>, outcome: Result<T, Rejection<E>>, is_canceled: &dyn Fn() -> bool) {
        let Self {
            continuation,
            settle_child,
            fail_child,
        } = *self;

        let result = match (outcome, continuation.on_fulfilled, continuation.on_rejected) {
            (Ok(value), FulfilledArm::PassThrough(convert), _) => {
                Ok(Ok(Resolution::Value(convert(value))))
            }
            (Ok(value), FulfilledArm::Handler(handler), _) => run_guarded(move || handler(value)),
            (Err(rejection), _, Some(handler)) => run_guarded(move || handler(rejection)),
            (Err(rejection), _, None) => {
                fail_child.reject_with(rejection);
                return;
            }
        };

        // Settling may subscribe to a returned thenable, which can panic too.
        let message = match result {
            Ok(Ok(resolution)) => match run_guarded(move || settle_child.settle(resolution)) {
                Ok(()) => return,
                Err(message) => message,
            },
            Ok(Err(error)) => {
                let is_canceled = is_canceled();
                debug!(is_canceled, "continuation returned an error");
                fail_child.reject_with(Rejection::Failed { error, is_canceled });
                return;
            }
            Err(message) => message,
        };
        let is_canceled = is_canceled();
        debug!(%message, is_canceled, "continuation panicked");
        fail_child.reject_with(Rejection::Panicked {
            message,
            is_canceled,
        });
    }
}

/// Runs a handler, turning a panic into its message.
fn run_guarded<R>(handler: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(handler)).map_err(|panic_info| {
        if let Some(message) = panic_info.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = panic_info.downcast_ref::<String>() {
            message.clone()
        } else {
            "Unknown panic".to_string()
        }
    })
}

/// Reactions waiting for a future's next dispatch pass.
///
/// Most futures have one or two subscribers, so the first two reactions
/// are stored inline.
pub(crate) struct ContinuationQueue<T, E> {
    reactions: SmallVec<[Box<dyn Reaction<T, E>>; 2]>,
}

impl<T, E> ContinuationQueue<T, E> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            reactions: SmallVec::new(),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, reaction: Box<dyn Reaction<T, E>>) {
        self.reactions.push(reaction);
    }

    /// Removes every queued reaction, in registration order.
    #[inline]
    pub(crate) fn take(&mut self) -> SmallVec<[Box<dyn Reaction<T, E>>; 2]> {
        std::mem::take(&mut self.reactions)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.reactions.len()
    }
}

impl<T, E> Default for ContinuationQueue<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
