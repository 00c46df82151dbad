//! Error types produced by `rxtap` itself.
//!
//! Failures of the wrapped publisher are not part of this taxonomy. They travel
//! downstream untouched as [`Completion::Failure`].
//!
//! [`Completion::Failure`]: ../observer/enum.Completion.html#variant.Failure
mod tap_errors;

pub use tap_errors::*;
