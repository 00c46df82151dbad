//! Stock publishers: iterator-backed, single-value, empty, failing, never-ending
//! and `Tokio` channel-backed.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use super::Observable;
use crate::{
    observer::{Completion, Observer},
    subscription::subscribe::{CancelLogic, Subscriber, Subscription, SubscriptionHandle},
};

// Emission state of one `from_iter` subscription.
//
// `wip` counts drain requests. Whoever moves it away from zero emits on behalf of
// everyone else, so a `request` made from inside `on_subscribe` or `next` only
// bumps the counter instead of recursing into emission.
struct IterDrain<I: Iterator, E> {
    iter: Mutex<Option<I>>,
    subscriber: Mutex<Subscriber<I::Item, E>>,
    wip: AtomicUsize,
}

impl<I: Iterator, E> IterDrain<I, E> {
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
            self.emit_loop(1);
        }
    }

    fn emit_loop(&self, mut missed: usize) {
        loop {
            self.emit_available();
            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }

    // The iterator is only advanced against demand. Without demand, exhaustion
    // is detected from an exact `size_hint` of zero.
    fn emit_available(&self) {
        let mut subscriber = self.subscriber.lock();
        let Some(subscription) = subscriber.subscription().cloned() else {
            return;
        };
        let mut slot = self.iter.lock();
        let Some(iter) = slot.as_mut() else {
            return;
        };

        while subscription.is_active() {
            if !subscription.has_demand() {
                if iter.size_hint().1 == Some(0) {
                    *slot = None;
                    subscriber.complete(Completion::Finished);
                }
                return;
            }
            match iter.next() {
                Some(v) => subscriber.next(v),
                None => {
                    *slot = None;
                    subscriber.complete(Completion::Finished);
                    return;
                }
            }
        }
        // Cancelled: release the iterator.
        *slot = None;
    }
}

impl<T, E> Observable<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a cold publisher emitting the items of `iterable`, one per unit of
    /// demand, then completing with [`Completion::Finished`].
    ///
    /// Every subscription iterates its own clone of `iterable`, which is advanced
    /// only when there is outstanding demand. An iterator whose `size_hint`
    /// reports it exhausted completes without waiting for more demand, so an empty
    /// `Vec` or range completes right after `on_subscribe`. Other iterators
    /// complete on the first request after their last item.
    pub fn from_iter<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Observable::new(move |subscriber| {
            let drain = Arc::new(IterDrain {
                iter: Mutex::new(Some(iterable.clone().into_iter())),
                subscriber: Mutex::new(subscriber),
                // Held by this call until the subscriber has been told about the
                // subscription.
                wip: AtomicUsize::new(1),
            });
            let drain_r = Arc::clone(&drain);
            let subscription = Subscription::empty().with_request_logic(move |_| drain_r.drain());

            drain.subscriber.lock().on_subscribe(subscription.clone());
            drain.emit_loop(1);
            subscription
        })
    }

    /// Emits `value` once, then completes.
    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Observable::from_iter(Some(value))
    }

    /// Completes immediately without emitting.
    pub fn empty() -> Self {
        Observable::new(|mut subscriber| {
            let subscription = Subscription::empty();
            subscriber.on_subscribe(subscription.clone());
            subscriber.complete(Completion::Finished);
            subscription
        })
    }

    /// Fails immediately with `error`, without emitting.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Observable::new(move |mut subscriber| {
            let subscription = Subscription::empty();
            subscriber.on_subscribe(subscription.clone());
            subscriber.complete(Completion::Failure(error.clone()));
            subscription
        })
    }

    /// Never emits and never completes. Accepts requests and cancellation.
    pub fn never() -> Self {
        Observable::new(|mut subscriber| {
            let subscription = Subscription::empty();
            subscriber.on_subscribe(subscription.clone());
            subscription
        })
    }

    /// Creates a publisher emitting the messages received on `rx` from a spawned
    /// `Tokio` task.
    ///
    /// The task waits for demand before receiving each message, stops as soon as
    /// the subscription is cancelled and completes with [`Completion::Finished`]
    /// when every sender has been dropped. Use `join_concurrent().await` on the
    /// returned subscription to wait for it.
    ///
    /// A channel can only be drained once: subscribing a second time completes
    /// immediately.
    ///
    /// # Panics
    ///
    /// Subscribing outside of a `Tokio` runtime panics.
    pub fn from_receiver(rx: mpsc::Receiver<T>) -> Self {
        let rx = Mutex::new(Some(rx));

        Observable::new(move |mut subscriber| {
            let Some(mut rx) = rx.lock().take() else {
                tracing::debug!("channel already drained by a previous subscription");
                let subscription = Subscription::empty();
                subscriber.on_subscribe(subscription.clone());
                subscriber.complete(Completion::Finished);
                return subscription;
            };

            let demand_signal = Arc::new(Notify::new());
            let cancel_signal = Arc::new(Notify::new());
            let demand_signal_c = Arc::clone(&demand_signal);
            let cancel_signal_c = Arc::clone(&cancel_signal);

            let subscription = Subscription::new(
                CancelLogic::Logic(Box::new(move || cancel_signal_c.notify_one())),
                SubscriptionHandle::Nil,
            )
            .with_request_logic(move |_| demand_signal_c.notify_one());

            subscriber.on_subscribe(subscription.clone());

            let s = subscription.clone();
            let join_handle = tokio::task::spawn(async move {
                while s.is_active() {
                    if !s.has_demand() {
                        tokio::select! {
                            biased;
                            _ = cancel_signal.notified() => break,
                            _ = demand_signal.notified() => continue,
                        }
                    }
                    tokio::select! {
                        biased;
                        _ = cancel_signal.notified() => break,
                        received = rx.recv() => match received {
                            Some(v) => subscriber.next(v),
                            None => {
                                subscriber.complete(Completion::Finished);
                                break;
                            }
                        },
                    }
                }
                tracing::trace!(subscription = %s.id(), "receiver task finished");
            });

            subscription.set_handle(SubscriptionHandle::JoinTask(join_handle));
            subscription
        })
    }
}
