//! Synchronous error types.
//!
//! Errors that happen while a future *resolves* are never returned from a
//! function; they become the [`Rejection`](crate::future::Rejection) of the
//! affected future. The types here cover the two failures reported to the
//! caller on the spot, both of which can only happen at the type-erased
//! boundary ([`Future::from_any`](crate::future::Future::from_any) and
//! [`Future::then_any`](crate::future::Future::then_any)). Typed closures
//! rule them out at compile time.

/// The executor handed to a type-erased constructor is not an executor.
///
/// # Examples
///
/// ```rust
/// use cancelable::error::ConstructionError;
///
/// let error = ConstructionError { expected: "Box<dyn FnOnce(Settle, Fail)>" };
/// assert_eq!(
///     format!("{error}"),
///     "executor is not callable: expected Box<dyn FnOnce(Settle, Fail)>"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionError {
    /// Name of the type the executor had to be.
    pub expected: &'static str,
}

impl std::fmt::Display for ConstructionError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "executor is not callable: expected {}",
            self.expected
        )
    }
}

impl std::error::Error for ConstructionError {}

/// A handler handed to a type-erased `then` is not a handler.
///
/// Raised before any child future is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Which argument failed, `"on_fulfilled"` or `"on_rejected"`.
    pub argument: &'static str,
    /// Name of the type the handler had to be.
    pub expected: &'static str,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} is not callable: expected {}",
            self.argument, self.expected
        )
    }
}

impl std::error::Error for ValidationError {}

/// Unified synchronous error type.
///
/// # Examples
///
/// ```rust
/// use cancelable::error::{FutureError, ValidationError};
///
/// let error = FutureError::from(ValidationError {
///     argument: "on_rejected",
///     expected: "Box<dyn FnOnce(Rejection<E>) -> Result<T, E>>",
/// });
/// assert!(format!("{error}").starts_with("on_rejected is not callable"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureError {
    /// The executor was not callable.
    Construction(ConstructionError),
    /// A `then`/`catch` handler was not callable.
    Validation(ValidationError),
}

impl std::fmt::Display for FutureError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Construction(error) => write!(formatter, "{error}"),
            Self::Validation(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for FutureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Construction(error) => Some(error),
            Self::Validation(error) => Some(error),
        }
    }
}

impl From<ConstructionError> for FutureError {
    fn from(error: ConstructionError) -> Self {
        Self::Construction(error)
    }
}

impl From<ValidationError> for FutureError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}
