//! The shared state behind a future and its settlement entry points.
//!
//! Everything that mutates a future goes through [`Shared`]. User code
//! (handlers, executors, thenables) never runs while the `RefCell` is
//! borrowed, so re-entrant calls from inside a handler are safe.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::{Rc, Weak};

use super::continuation::{ContinuationQueue, Reaction};
use super::state::{Rejection, State};
use super::thenable::{OnFulfilled, OnRejected, Resolution};
use crate::scheduler::Scheduler;
use crate::trace_compat::{debug, trace};

/// Upstream cancellation link installed on a child future.
pub(crate) type CancelHook = Rc<dyn CancelLink>;

/// The future a child was derived from, with its value type erased.
pub(crate) trait CancelLink {
    /// The linked future's own upstream link, if it is still alive and has one.
    fn upstream(&self) -> Option<CancelHook>;

    /// Cancels the linked future alone, without following its upstream link.
    fn cancel_here(&self);
}

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
    static GRAVEYARD: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
    static REAPING: Cell<bool> = const { Cell::new(false) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

pub(crate) struct Core<T: 'static, E: 'static> {
    id: u64,
    state: State<T, E>,
    canceled: bool,
    continuations: ContinuationQueue<T, E>,
    cancel_hook: Option<CancelHook>,
    scheduler: Rc<dyn Scheduler>,
}

/// Continuations own their child futures, so dropping a pending chain
/// would recurse once per link. Each core hands its continuations to a
/// thread-local list instead, and the outermost drop empties it in a loop.
impl<T: 'static, E: 'static> Drop for Core<T, E> {
    fn drop(&mut self) {
        let reactions = self.continuations.take();
        if !reactions.is_empty() {
            bury(Box::new(reactions));
        }
    }
}

fn bury(garbage: Box<dyn Any>) {
    // During thread teardown the list may be gone; the garbage is then
    // dropped in place.
    if GRAVEYARD
        .try_with(move |graveyard| graveyard.borrow_mut().push(garbage))
        .is_err()
    {
        return;
    }
    if REAPING.with(|reaping| reaping.replace(true)) {
        return;
    }
    while let Some(garbage) = GRAVEYARD.with(|graveyard| graveyard.borrow_mut().pop()) {
        drop(garbage);
    }
    REAPING.with(|reaping| reaping.set(false));
}

/// Reference-counted handle to a [`Core`].
pub(crate) struct Shared<T: 'static, E: 'static> {
    core: Rc<RefCell<Core<T, E>>>,
}

impl<T: 'static, E: 'static> Clone for Shared<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: 'static, E: 'static> Shared<T, E> {
    pub(crate) fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            core: Rc::new(RefCell::new(Core {
                id: next_id(),
                state: State::Pending,
                canceled: false,
                continuations: ContinuationQueue::new(),
                cancel_hook: None,
                scheduler,
            })),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.core.borrow().id
    }

    pub(crate) fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.core.borrow().scheduler)
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.core.borrow().canceled
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.core.borrow().state.is_pending()
    }

    pub(crate) fn is_fulfilled(&self) -> bool {
        self.core.borrow().state.is_fulfilled()
    }

    pub(crate) fn is_rejected(&self) -> bool {
        self.core.borrow().state.is_rejected()
    }

    pub(crate) fn state_label(&self) -> &'static str {
        self.core.borrow().state.label()
    }

    pub(crate) fn queued_continuations(&self) -> usize {
        self.core.borrow().continuations.len()
    }

    /// Installs the link that forwards this future's cancellation upstream.
    pub(crate) fn set_cancel_hook(&self, hook: CancelHook) {
        self.core.borrow_mut().cancel_hook = Some(hook);
    }

    pub(crate) fn push_reaction(&self, reaction: Box<dyn Reaction<T, E>>) {
        self.core.borrow_mut().continuations.push(reaction);
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Shared<T, E> {
    pub(crate) fn state(&self) -> State<T, E> {
        self.core.borrow().state.clone()
    }

    /// Settles with `resolution`, adopting thenables until a concrete
    /// outcome is reached.
    ///
    /// A thenable that answers synchronously from inside `subscribe` is not
    /// followed recursively: its answer lands in a slot and the loop picks
    /// it up once `subscribe` returns. A thenable that answers later calls
    /// back into `resolve` on a fresh stack.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from `subscribe` if the thenable had not answered
    /// before panicking. A panic after the answer is ignored.
    pub(crate) fn resolve(&self, resolution: Resolution<T, E>) {
        let mut next = resolution;
        loop {
            if !self.is_pending() {
                return;
            }
            let thenable = match next {
                Resolution::Value(value) => {
                    self.fulfill(value);
                    return;
                }
                Resolution::Adopt(thenable) => thenable,
            };
            trace!(future = self.id(), "adopting thenable");

            let bounce = Rc::new(RefCell::new(Bounce::Subscribing));
            let on_fulfilled: OnFulfilled<T, E> = {
                let bounce = Rc::clone(&bounce);
                let target = self.clone();
                Box::new(move |resolution| answer(&bounce, &target, Ok(resolution)))
            };
            let on_rejected: OnRejected<E> = {
                let bounce = Rc::clone(&bounce);
                let target = self.clone();
                Box::new(move |rejection| answer(&bounce, &target, Err(rejection)))
            };
            let subscribed = catch_unwind(AssertUnwindSafe(move || {
                thenable.subscribe(on_fulfilled, on_rejected);
            }));

            let landed = std::mem::replace(&mut *bounce.borrow_mut(), Bounce::Returned);
            match landed {
                Bounce::Landed(Ok(resolution)) => {
                    *bounce.borrow_mut() = Bounce::Answered;
                    if subscribed.is_err() {
                        debug!(future = self.id(), "thenable panicked after answering");
                    }
                    next = resolution;
                }
                Bounce::Landed(Err(rejection)) => {
                    *bounce.borrow_mut() = Bounce::Answered;
                    self.fail(rejection);
                    return;
                }
                Bounce::Subscribing | Bounce::Returned | Bounce::Answered => {
                    // Unanswered: the caller decides what a panic means here.
                    if let Err(payload) = subscribed {
                        resume_unwind(payload);
                    }
                    return;
                }
            }
        }
    }

    fn fulfill(&self, value: T) {
        {
            let mut core = self.core.borrow_mut();
            if !core.state.is_pending() {
                return;
            }
            core.state = State::Fulfilled(value);
        }
        trace!(future = self.id(), "fulfilled");
        self.schedule_dispatch();
    }

    pub(crate) fn fail(&self, rejection: Rejection<E>) {
        {
            let mut core = self.core.borrow_mut();
            if !core.state.is_pending() {
                return;
            }
            core.state = State::Rejected(rejection);
        }
        trace!(future = self.id(), "rejected");
        self.schedule_dispatch();
    }

    /// Forces the future into `Rejected(Canceled)` whatever its state, after
    /// canceling every future upstream of it, source first.
    ///
    /// The upstream walk is a loop over type-erased links, so chain length
    /// does not grow the stack.
    pub(crate) fn cancel(&self) {
        let mut chain = Vec::new();
        let mut next = self.core.borrow().cancel_hook.clone();
        while let Some(link) = next {
            next = link.upstream();
            chain.push(link);
        }
        for link in chain.iter().rev() {
            link.cancel_here();
        }
        self.cancel_here();
    }

    fn cancel_here(&self) {
        {
            let mut core = self.core.borrow_mut();
            core.canceled = true;
            core.state = State::Rejected(Rejection::Canceled);
        }
        debug!(future = self.id(), "canceled");
        self.schedule_dispatch();
    }

    /// A link to this future, for installing on a child.
    ///
    /// Holds a weak reference: the child must not keep its parent alive.
    pub(crate) fn upstream_hook(&self) -> CancelHook {
        Rc::new(Upstream {
            parent: Rc::downgrade(&self.core),
        })
    }

    pub(crate) fn schedule_dispatch(&self) {
        let scheduler = self.scheduler();
        let this = self.clone();
        scheduler.schedule(Box::new(move || this.dispatch()));
    }

    /// Runs every queued reaction against the current outcome.
    ///
    /// The queue is taken up front; reactions registered while this pass
    /// runs are served by the pass their own registration scheduled.
    fn dispatch(&self) {
        let reactions = {
            let mut core = self.core.borrow_mut();
            if core.state.is_pending() {
                return;
            }
            core.continuations.take()
        };
        if reactions.is_empty() {
            return;
        }
        trace!(
            future = self.id(),
            count = reactions.len(),
            "dispatching continuations"
        );
        let is_canceled = || self.is_canceled();
        for reaction in reactions {
            let Some(outcome) = self.core.borrow().state.outcome() else {
                continue;
            };
            reaction.react(outcome, &is_canceled);
        }
    }
}

struct Upstream<T: 'static, E: 'static> {
    parent: Weak<RefCell<Core<T, E>>>,
}

impl<T: Clone + 'static, E: Clone + 'static> CancelLink for Upstream<T, E> {
    fn upstream(&self) -> Option<CancelHook> {
        let core = self.parent.upgrade()?;
        core.borrow().cancel_hook.clone()
    }

    fn cancel_here(&self) {
        if let Some(core) = self.parent.upgrade() {
            Shared { core }.cancel_here();
        }
    }
}

/// Where the answer of a thenable under adoption goes.
enum Bounce<T, E> {
    /// `subscribe` is still running and nothing has answered.
    Subscribing,
    /// Answered from inside `subscribe`; the adoption loop takes it from here.
    Landed(Result<Resolution<T, E>, Rejection<E>>),
    /// `subscribe` returned without an answer.
    Returned,
    /// The one answer that counts has been consumed.
    Answered,
}

fn answer<T: Clone + 'static, E: Clone + 'static>(
    bounce: &RefCell<Bounce<T, E>>,
    target: &Shared<T, E>,
    reply: Result<Resolution<T, E>, Rejection<E>>,
) {
    let resume = {
        let mut slot = bounce.borrow_mut();
        match std::mem::replace(&mut *slot, Bounce::Answered) {
            Bounce::Subscribing => {
                *slot = Bounce::Landed(reply);
                return;
            }
            Bounce::Returned => reply,
            consumed @ (Bounce::Landed(_) | Bounce::Answered) => {
                *slot = consumed;
                return;
            }
        }
    };
    match resume {
        Ok(resolution) => target.resolve(resolution),
        Err(rejection) => target.fail(rejection),
    }
}
