//! The `observable` module provides the publisher side of `rxtap`: the
//! closure-backed [`Observable`], the stock sources, and the [`EventTap`]
//! operator with its extension methods.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::{
    demand::Demand,
    errors::BoxError,
    observer::{Completion, Observer},
    subscription::subscribe::{
        CancelLogic, Subscribeable, Subscriber, Subscription, SubscriptionHandle, SubscriptionId,
    },
};

pub mod diagnostics;
mod sources;
pub mod tap;

pub use tap::{EventTap, TapObservers};

/// A publisher defined by the function run for every subscriber.
///
/// The subscribe function receives the [`Subscriber`] and must call its
/// `on_subscribe` with a [`Subscription`] before delivering values. Values must
/// only be emitted while the subscription has outstanding demand; the subscriber
/// drops anything beyond it. The same `Subscription` is returned to the caller of
/// `subscribe`.
///
/// # Example: synchronous `Observable` honouring demand
///
/// ```no_run
/// use rxtap::subscribe::{Subscriber, Subscription};
/// use rxtap::{Completion, Observable, Observer, Subscribeable};
///
/// let mut countdown: Observable<u32> = Observable::new(|mut subscriber| {
///     let subscription = Subscription::empty();
///     // The default subscriber requests unlimited demand here.
///     subscriber.on_subscribe(subscription.clone());
///
///     let mut i = 3;
///     while i > 0 && subscription.has_demand() {
///         subscriber.next(i);
///         i -= 1;
///     }
///     subscriber.complete(Completion::Finished);
///     subscription
/// });
///
/// countdown.subscribe(Subscriber::new(
///     |v| println!("{}", v),
///     |c| println!("done: {:?}", c.is_finished()),
/// ));
/// ```
///
/// # Example: asynchronous `Observable` emitting from an OS thread
///
/// ```no_run
/// use std::time::Duration;
///
/// use rxtap::subscribe::{CancelLogic, Subscriber, Subscription, SubscriptionHandle};
/// use rxtap::{Completion, Observable, ObservableExt, Observer, Subscribeable};
///
/// let observable: Observable<u32> = Observable::new(|mut o| {
///     let subscription = Subscription::new(CancelLogic::Nil, SubscriptionHandle::Nil);
///     o.on_subscribe(subscription.clone());
///
///     let s = subscription.clone();
///     let join_handle = std::thread::spawn(move || {
///         for i in 0..=15 {
///             // Stop as soon as the downstream cancels.
///             if !s.is_active() {
///                 return;
///             }
///             o.next(i);
///             std::thread::sleep(Duration::from_millis(1));
///         }
///         o.complete(Completion::Finished);
///     });
///     subscription.set_handle(SubscriptionHandle::JoinThread(join_handle));
///     subscription
/// });
///
/// let subscription = observable
///     .on_value(|v| println!("about to deliver {}", v))
///     .subscribe(Subscriber::on_next(|v| println!("got {}", v)));
///
/// if subscription.join().is_err() {
///     // Handle error
/// }
/// ```
pub struct Observable<T, E = BoxError> {
    subscribe_fn: Box<dyn FnMut(Subscriber<T, E>) -> Subscription + Send + Sync>,
}

impl<T, E> Observable<T, E> {
    /// Creates a new `Observable` with the provided subscribe function.
    pub fn new(
        sf: impl FnMut(Subscriber<T, E>) -> Subscription + Send + Sync + 'static,
    ) -> Self {
        Observable {
            subscribe_fn: Box::new(sf),
        }
    }
}

impl<T, E> Subscribeable for Observable<T, E> {
    type ObsType = T;
    type ErrType = E;

    fn subscribe(&mut self, s: Subscriber<Self::ObsType, Self::ErrType>) -> Subscription {
        (self.subscribe_fn)(s)
    }
}

/// Extension methods available on every publisher.
///
/// The `on_*` shorthands each build an [`EventTap`] with a single observer. Use
/// [`tap`](ObservableExt::tap) with a [`TapObservers`] to register several
/// observers or a custom diagnostic sink.
pub trait ObservableExt<T: 'static, E: 'static>: Subscribeable<ObsType = T, ErrType = E> {
    /// Wraps the publisher in an [`EventTap`] running `observers`.
    fn tap(self, observers: TapObservers<T, E>) -> EventTap<Self>
    where
        Self: Sized,
    {
        EventTap::new(self, observers)
    }

    /// Same as [`tap`](ObservableExt::tap).
    fn handle_events(self, observers: TapObservers<T, E>) -> EventTap<Self>
    where
        Self: Sized,
    {
        self.tap(observers)
    }

    /// Observe subscriptions being established.
    fn on_subscription(self, f: impl Fn(SubscriptionId) + Send + Sync + 'static) -> EventTap<Self>
    where
        Self: Sized,
    {
        self.tap(TapObservers::new().on_subscribe(f))
    }

    /// Observe every value before it is delivered.
    fn on_value(self, f: impl Fn(&T) + Send + Sync + 'static) -> EventTap<Self>
    where
        Self: Sized,
    {
        self.tap(TapObservers::new().on_value(f))
    }

    /// Observe the terminal completion before it is delivered.
    fn on_completion(self, f: impl Fn(&Completion<E>) + Send + Sync + 'static) -> EventTap<Self>
    where
        Self: Sized,
    {
        self.tap(TapObservers::new().on_complete(f))
    }

    /// Observe the downstream cancelling.
    fn on_cancel(self, f: impl Fn() + Send + Sync + 'static) -> EventTap<Self>
    where
        Self: Sized,
    {
        self.tap(TapObservers::new().on_cancel(f))
    }

    /// Observe every demand request made by the downstream.
    fn on_request(self, f: impl Fn(Demand) + Send + Sync + 'static) -> EventTap<Self>
    where
        Self: Sized,
    {
        self.tap(TapObservers::new().on_request(f))
    }

    /// Transforms the items emitted by the publisher using a transformation
    /// function. Demand and cancellation pass through one-to-one.
    fn map<U, F>(mut self, f: F) -> Observable<U, E>
    where
        Self: Sized + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
        T: Send,
        E: Send,
        U: 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let f = Arc::clone(&f);
            let upstream: Arc<OnceLock<Subscription>> = Arc::new(OnceLock::new());
            let upstream_r = Arc::clone(&upstream);
            let upstream_c = Arc::clone(&upstream);
            let upstream_s = Arc::clone(&upstream);

            let downstream_subscription = Subscription::new(
                CancelLogic::Logic(Box::new(move || {
                    if let Some(upstream) = upstream_c.get() {
                        upstream.cancel();
                    }
                })),
                SubscriptionHandle::Nil,
            )
            .with_request_logic(move |demand| {
                if let Some(upstream) = upstream_r.get() {
                    upstream.request(demand);
                }
            });

            let o_shared = Arc::new(Mutex::new(o));
            let o_cloned_c = Arc::clone(&o_shared);
            let o_cloned_s = Arc::clone(&o_shared);
            let ds = downstream_subscription.clone();

            let mut u = Subscriber::new(
                move |v: T| {
                    let t = f(v);
                    o_shared.lock().next(t);
                },
                move |completion: Completion<E>| {
                    o_cloned_c.lock().complete(completion);
                },
            );
            u.on_subscribed(move |s| {
                let _ = upstream_s.set(s.clone());
                o_cloned_s.lock().on_subscribe(ds.clone());
            });

            let s = self.subscribe(u);
            downstream_subscription.set_handle(s.take_handle());
            let _ = upstream.set(s);
            downstream_subscription
        })
    }
}

impl<O, T: 'static, E: 'static> ObservableExt<T, E> for O where
    O: Subscribeable<ObsType = T, ErrType = E>
{
}
