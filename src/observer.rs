//! The consumer side of a publisher.

use crate::subscription::subscribe::Subscription;

/// Terminal signal of a stream.
///
/// At most one `Completion` is delivered per subscription and no value follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<E> {
    /// The publisher emitted everything it had.
    Finished,
    /// The publisher stopped with an error. Operators forward it verbatim.
    Failure(E),
}

impl<E> Completion<E> {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Completion::Failure(_))
    }
}

/// Reactions of a consumer registered with a publisher.
///
/// `on_subscribe` is called exactly once before any `next`. `next` is called zero
/// or more times and `complete` at most once, after which nothing else follows.
pub trait Observer {
    type NextFnType;
    type ErrorType;

    fn on_subscribe(&mut self, subscription: Subscription);
    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self, _: Completion<Self::ErrorType>);
}
