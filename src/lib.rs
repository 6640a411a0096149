//! # cancelable
//!
//! A cancelable asynchronous value for single-threaded, cooperatively
//! scheduled code.
//!
//! ## Overview
//!
//! A [`Future<T, E>`](future::Future) eventually holds either a value or a
//! [`Rejection`](future::Rejection). It provides:
//!
//! - **Chaining**: `then`, `then_or_else`, `and_then` and `catch` return
//!   new, linked futures; any number of them may hang off one future
//! - **Adoption**: settling with a [`Thenable`](future::Thenable) (another
//!   future, or any callback-registering value) follows it to a concrete
//!   outcome, flattening nested thenables without growing the stack
//! - **Upstream Cancellation**: canceling a derived future cancels the
//!   future it came from, up to the source
//! - **Deferred Dispatch**: continuations run on a
//!   [`Scheduler`](scheduler::Scheduler), never inside the call that
//!   triggers them
//!
//! ## Feature Flags
//!
//! - `tracing` (default): emit structured events through the `tracing` crate
//!
//! ## Example
//!
//! ```rust
//! use cancelable::prelude::*;
//!
//! let queue = MicrotaskQueue::new();
//! let source: Future<i32, String> = Future::new_in(queue.clone(), |settle, _| settle.resolve(1));
//! let derived = source.then(|value| Ok(value + 1));
//!
//! queue.run_until_idle();
//! assert_eq!(derived.value(), Some(2));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use cancelable::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ConstructionError, FutureError, ValidationError};
    pub use crate::future::{
        Continuation, Fail, Future, Rejection, Resolution, Settle, State, Thenable,
    };
    pub use crate::scheduler::{MicrotaskQueue, Scheduler, run_microtasks};
}

pub mod error;
pub mod future;
pub mod scheduler;

mod trace_compat;
