//! The `EventTap` operator: lifecycle observers that never touch the data path.
//!
//! An [`EventTap`] wraps a publisher and runs optional observer callbacks for the
//! five lifecycle events of every subscription made through it:
//!
//! ```text
//!             on_subscribe / on_value / on_complete
//!   source ──────────────────────────────────────────► EventTap ──► subscriber
//!          ◄────────────────────────────────────────── (observers)
//!                     on_request / on_cancel
//! ```
//!
//! Each observer runs synchronously before the event is forwarded, on whatever
//! thread delivered it. Observers receive a reference to the payload and cannot
//! change what flows downstream. A panicking observer is reported through the
//! configured [`DiagnosticSink`] and the event is forwarded anyway.
//!
//! Observers must not call back into the subscription they are observing.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, OnceLock},
};

use parking_lot::Mutex;

use crate::{
    demand::Demand,
    errors::{BoxError, TapError, TapEvent},
    observable::diagnostics::{DiagnosticSink, TracingSink},
    observer::{Completion, Observer},
    subscription::subscribe::{
        CancelLogic, Subscribeable, Subscriber, Subscription, SubscriptionHandle, SubscriptionId,
    },
};

type SubscribeObserver = Arc<dyn Fn(SubscriptionId) + Send + Sync>;
type ValueObserver<T> = Arc<dyn Fn(&T) + Send + Sync>;
type CompleteObserver<E> = Arc<dyn Fn(&Completion<E>) + Send + Sync>;
type CancelObserver = Arc<dyn Fn() + Send + Sync>;
type RequestObserver = Arc<dyn Fn(Demand) + Send + Sync>;

/// The observer callbacks of an [`EventTap`], one optional slot per lifecycle
/// event, plus the sink that receives observer failures.
///
/// ```no_run
/// use rxtap::{Demand, Observable, ObservableExt, Subscribeable, TapObservers};
/// use rxtap::subscribe::Subscriber;
///
/// let observers = TapObservers::new()
///     .on_value(|v: &i32| tracing::info!(value = v, "frame"))
///     .on_request(|d: Demand| tracing::debug!(%d, "requested"))
///     .on_cancel(|| tracing::info!("camera released"));
///
/// let mut frames = Observable::<i32>::from_iter(vec![1, 2, 3]).tap(observers);
/// frames.subscribe(Subscriber::on_next(|v| println!("{}", v)));
/// ```
pub struct TapObservers<T, E = BoxError> {
    on_subscribe: Option<SubscribeObserver>,
    on_value: Option<ValueObserver<T>>,
    on_complete: Option<CompleteObserver<E>>,
    on_cancel: Option<CancelObserver>,
    on_request: Option<RequestObserver>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<T, E> TapObservers<T, E> {
    /// No observers, failures reported to [`TracingSink`].
    #[must_use]
    pub fn new() -> Self {
        TapObservers {
            on_subscribe: None,
            on_value: None,
            on_complete: None,
            on_cancel: None,
            on_request: None,
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Runs when a subscription is established, before the subscriber's own
    /// `on_subscribe`. Receives the id of the downstream subscription.
    #[must_use]
    pub fn on_subscribe(mut self, f: impl Fn(SubscriptionId) + Send + Sync + 'static) -> Self {
        self.on_subscribe = Some(Arc::new(f));
        self
    }

    /// Runs with every value before the subscriber receives it.
    #[must_use]
    pub fn on_value(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_value = Some(Arc::new(f));
        self
    }

    /// Runs with the terminal completion before the subscriber receives it.
    /// Never runs for a subscription that was cancelled first.
    #[must_use]
    pub fn on_complete(mut self, f: impl Fn(&Completion<E>) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Runs when the downstream cancels, at most once per subscription.
    #[must_use]
    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(f));
        self
    }

    /// Runs with the individual demand of each downstream `request` call.
    #[must_use]
    pub fn on_request(mut self, f: impl Fn(Demand) + Send + Sync + 'static) -> Self {
        self.on_request = Some(Arc::new(f));
        self
    }

    /// Replaces the sink that receives observer failures.
    #[must_use]
    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Arc::new(sink);
        self
    }

    fn observe(&self, event: TapEvent, f: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            self.diagnostics
                .report(&TapError::observer_failure(event, payload.as_ref()));
        }
    }

    fn subscribed(&self, id: SubscriptionId) {
        if let Some(f) = &self.on_subscribe {
            self.observe(TapEvent::Subscribe, || f(id));
        }
    }

    fn value(&self, v: &T) {
        if let Some(f) = &self.on_value {
            self.observe(TapEvent::Value, || f(v));
        }
    }

    fn completed(&self, completion: &Completion<E>) {
        if let Some(f) = &self.on_complete {
            self.observe(TapEvent::Complete, || f(completion));
        }
    }

    fn cancelled(&self) {
        if let Some(f) = &self.on_cancel {
            self.observe(TapEvent::Cancel, || f());
        }
    }

    fn requested(&self, demand: Demand) {
        if let Some(f) = &self.on_request {
            self.observe(TapEvent::Request, || f(demand));
        }
    }
}

impl<T, E> Default for TapObservers<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for TapObservers<T, E> {
    fn clone(&self) -> Self {
        TapObservers {
            on_subscribe: self.on_subscribe.clone(),
            on_value: self.on_value.clone(),
            on_complete: self.on_complete.clone(),
            on_cancel: self.on_cancel.clone(),
            on_request: self.on_request.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

/// A publisher that forwards everything from `source` unchanged while feeding
/// each lifecycle event to its [`TapObservers`].
///
/// Usually built with [`ObservableExt::tap`] or one of its shorthands. Every
/// `subscribe` call creates independent per-subscription state, so one tap can be
/// subscribed to many times.
///
/// [`ObservableExt::tap`]: ../trait.ObservableExt.html#method.tap
pub struct EventTap<P: Subscribeable> {
    source: P,
    observers: Arc<TapObservers<P::ObsType, P::ErrType>>,
}

impl<P: Subscribeable> EventTap<P> {
    pub fn new(source: P, observers: TapObservers<P::ObsType, P::ErrType>) -> Self {
        EventTap {
            source,
            observers: Arc::new(observers),
        }
    }

    /// The wrapped publisher.
    pub fn get_ref(&self) -> &P {
        &self.source
    }

    /// Unwraps the tap, returning the wrapped publisher.
    pub fn into_inner(self) -> P {
        self.source
    }
}

impl<P> Subscribeable for EventTap<P>
where
    P: Subscribeable,
    P::ObsType: Send + 'static,
    P::ErrType: Send + 'static,
{
    type ObsType = P::ObsType;
    type ErrType = P::ErrType;

    fn subscribe(&mut self, s: Subscriber<Self::ObsType, Self::ErrType>) -> Subscription {
        let observers = Arc::clone(&self.observers);
        let upstream: Arc<OnceLock<Subscription>> = Arc::new(OnceLock::new());

        // Subscription handed downstream. Requests and cancels are observed first,
        // then forwarded to the upstream link once it exists.
        let downstream_subscription = {
            let observers_r = Arc::clone(&observers);
            let observers_c = Arc::clone(&observers);
            let upstream_r = Arc::clone(&upstream);
            let upstream_c = Arc::clone(&upstream);

            Subscription::new(
                CancelLogic::Logic(Box::new(move || {
                    observers_c.cancelled();
                    if let Some(upstream) = upstream_c.get() {
                        tracing::debug!(upstream = %upstream.id(), "tap subscription cancelled");
                        upstream.cancel();
                    }
                })),
                SubscriptionHandle::Nil,
            )
            .with_request_logic(move |demand| {
                observers_r.requested(demand);
                if let Some(upstream) = upstream_r.get() {
                    tracing::trace!(upstream = %upstream.id(), %demand, "forwarding request");
                    upstream.request(demand);
                }
            })
        };

        let s_shared = Arc::new(Mutex::new(s));
        let s_cloned_s = Arc::clone(&s_shared);
        let s_cloned_c = Arc::clone(&s_shared);

        let observers_v = Arc::clone(&observers);
        let observers_c = Arc::clone(&observers);
        let ds_v = downstream_subscription.clone();
        let ds_c = downstream_subscription.clone();
        let ds_s = downstream_subscription.clone();
        let upstream_s = Arc::clone(&upstream);

        let mut u = Subscriber::new(
            move |v: P::ObsType| {
                if !ds_v.is_active() {
                    return;
                }
                observers_v.value(&v);
                s_shared.lock().next(v);
            },
            move |completion: Completion<P::ErrType>| {
                if !ds_c.mark_completed() {
                    tracing::trace!(subscription = %ds_c.id(), "completion after cancel discarded");
                    return;
                }
                observers_c.completed(&completion);
                tracing::debug!(
                    subscription = %ds_c.id(),
                    failed = completion.is_failure(),
                    "tap subscription completed"
                );
                s_cloned_c.lock().complete(completion);
            },
        );
        // Demand comes from downstream only, so nothing is requested here.
        u.on_subscribed(move |upstream_subscription| {
            let _ = upstream_s.set(upstream_subscription.clone());
            tracing::debug!(
                subscription = %ds_s.id(),
                upstream = %upstream_subscription.id(),
                "tap subscription established"
            );
            observers.subscribed(ds_s.id());
            s_cloned_s.lock().on_subscribe(ds_s.clone());
        });

        let upstream_subscription = self.source.subscribe(u);
        downstream_subscription.set_handle(upstream_subscription.take_handle());
        if upstream.set(upstream_subscription.clone()).is_ok() {
            tracing::warn!(
                upstream = %upstream_subscription.id(),
                "source returned without calling on_subscribe"
            );
            if downstream_subscription.is_cancelled() {
                upstream_subscription.cancel();
            }
        }
        downstream_subscription
    }
}
