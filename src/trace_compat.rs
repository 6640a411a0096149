//! Structured logging shim.
//!
//! With the `tracing` feature enabled the macros are re-exported from the
//! `tracing` crate. Without it they expand to nothing, so call sites stay
//! the same either way.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
mod noop {
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, trace};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop::{debug, trace};
