//! Settlement state and rejection payloads.

use std::fmt;

/// Why a [`Future`](super::Future) was rejected.
///
/// Cancellation and continuation failures are not a separate channel: they
/// arrive as rejections, and [`Rejection::is_canceled`] tells them apart.
///
/// # Examples
///
/// ```rust
/// use cancelable::future::Rejection;
///
/// let plain: Rejection<&str> = Rejection::Reason("boom");
/// assert!(!plain.is_canceled());
/// assert_eq!(plain.error(), Some(&"boom"));
///
/// let canceled: Rejection<&str> = Rejection::Canceled;
/// assert!(canceled.is_canceled());
/// assert_eq!(canceled.error(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection<E> {
    /// Rejected through [`Fail::reject`](super::Fail::reject).
    Reason(E),
    /// A continuation returned `Err(error)`.
    Failed {
        /// The error the continuation returned.
        error: E,
        /// Whether the parent future was canceled when the failure was captured.
        is_canceled: bool,
    },
    /// A continuation panicked.
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
        /// Whether the parent future was canceled when the panic was captured.
        is_canceled: bool,
    },
    /// The future was canceled.
    Canceled,
}

impl<E> Rejection<E> {
    /// Returns `true` if this rejection carries the cancellation marker.
    pub const fn is_canceled(&self) -> bool {
        match self {
            Self::Canceled => true,
            Self::Failed { is_canceled, .. } | Self::Panicked { is_canceled, .. } => *is_canceled,
            Self::Reason(_) => false,
        }
    }

    /// The error value, for [`Reason`](Self::Reason) and [`Failed`](Self::Failed).
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Reason(error) | Self::Failed { error, .. } => Some(error),
            Self::Panicked { .. } | Self::Canceled => None,
        }
    }

    /// Consumes the rejection, returning the error value if it has one.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Reason(error) | Self::Failed { error, .. } => Some(error),
            Self::Panicked { .. } | Self::Canceled => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Rejection<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reason(error) => write!(formatter, "{error}"),
            Self::Failed { error, .. } => write!(formatter, "continuation failed: {error}"),
            Self::Panicked { message, .. } => {
                write!(formatter, "continuation panicked: {message}")
            }
            Self::Canceled => formatter.write_str("canceled"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Rejection<E> {}

/// The lifecycle state of a [`Future`](super::Future).
///
/// Leaves `Pending` at most once through settlement. Cancellation is the
/// only thing that can replace a settled state, and it always replaces it
/// with `Rejected(Rejection::Canceled)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State<T, E> {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled(T),
    /// Settled with a rejection.
    Rejected(Rejection<E>),
}

impl<T, E> State<T, E> {
    /// Returns `true` while the future is unsettled.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` once the future holds a value.
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Returns `true` once the future holds a rejection.
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled(_) => "fulfilled",
            Self::Rejected(_) => "rejected",
        }
    }
}

impl<T: Clone, E: Clone> State<T, E> {
    /// The settled outcome, or `None` while pending.
    pub(crate) fn outcome(&self) -> Option<Result<T, Rejection<E>>> {
        match self {
            Self::Pending => None,
            Self::Fulfilled(value) => Some(Ok(value.clone())),
            Self::Rejected(rejection) => Some(Err(rejection.clone())),
        }
    }
}
