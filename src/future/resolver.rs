//! The settlement entry points handed to an executor.

use std::fmt;

use super::core::Shared;
use super::state::Rejection;
use super::thenable::{Resolution, Thenable};

/// Fulfills a future, directly or by adopting a thenable.
///
/// Calls made after the future has left `Pending` are ignored.
pub struct Settle<T: 'static, E: 'static> {
    target: Shared<T, E>,
}

impl<T: 'static, E: 'static> Settle<T, E> {
    pub(crate) const fn new(target: Shared<T, E>) -> Self {
        Self { target }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Settle<T, E> {
    /// Fulfills with `value`.
    pub fn resolve(&self, value: T) {
        self.target.resolve(Resolution::Value(value));
    }

    /// Follows `thenable` until it reports a concrete outcome.
    pub fn adopt<R>(&self, thenable: R)
    where
        R: Thenable<T, E> + 'static,
    {
        self.target.resolve(Resolution::adopt(thenable));
    }

    /// Settles with an already-built [`Resolution`].
    pub fn settle(&self, resolution: Resolution<T, E>) {
        self.target.resolve(resolution);
    }
}

impl<T: 'static, E: 'static> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for Settle<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Settle")
            .field("future", &self.target.id())
            .finish()
    }
}

/// Rejects a future.
///
/// Calls made after the future has left `Pending` are ignored.
pub struct Fail<T: 'static, E: 'static> {
    target: Shared<T, E>,
}

impl<T: 'static, E: 'static> Fail<T, E> {
    pub(crate) const fn new(target: Shared<T, E>) -> Self {
        Self { target }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Fail<T, E> {
    /// Rejects with [`Rejection::Reason`].
    pub fn reject(&self, reason: E) {
        self.target.fail(Rejection::Reason(reason));
    }

    /// Rejects with an arbitrary payload.
    pub fn reject_with(&self, rejection: Rejection<E>) {
        self.target.fail(rejection);
    }
}

impl<T: 'static, E: 'static> Clone for Fail<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for Fail<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Fail")
            .field("future", &self.target.id())
            .finish()
    }
}
