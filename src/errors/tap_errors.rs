use std::{any::Any, error::Error, fmt, sync::Arc};

use thiserror::Error;

/// Shorthand for results whose error is a [`TapError`].
pub type Result<T> = std::result::Result<T, TapError>;

/// Default upstream failure type carried by [`Completion::Failure`].
///
/// [`Completion::Failure`]: ../observer/enum.Completion.html#variant.Failure
pub type BoxError = Arc<dyn Error + Send + Sync>;

/// Identifies which of the five lifecycle observers an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapEvent {
    Subscribe,
    Value,
    Complete,
    Cancel,
    Request,
}

impl fmt::Display for TapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TapEvent::Subscribe => "subscribe",
            TapEvent::Value => "value",
            TapEvent::Complete => "complete",
            TapEvent::Cancel => "cancel",
            TapEvent::Request => "request",
        };
        f.write_str(name)
    }
}

/// Errors raised by demand construction, lifecycle observers and join helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TapError {
    /// A finite demand was requested with a negative count.
    #[error("invalid demand: requested {requested} values, count must not be negative")]
    InvalidDemand { requested: i64 },

    /// A lifecycle observer panicked while it was being invoked. The event it
    /// was observing has still been forwarded.
    #[error("{event} observer failed: {message}")]
    ObserverFailure { event: TapEvent, message: String },

    /// `join()` was called on a subscription backed by a `Tokio` task.
    #[error("subscription is backed by a Tokio task, use `join_concurrent().await` instead")]
    JoinMismatch,

    /// The thread or task backing a subscription panicked or was aborted.
    #[error("failed to join publisher: {0}")]
    Join(String),
}

impl TapError {
    pub(crate) fn observer_failure(event: TapEvent, payload: &(dyn Any + Send)) -> Self {
        TapError::ObserverFailure {
            event,
            message: panic_message(payload),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
