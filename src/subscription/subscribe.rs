use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    thread::JoinHandle as ThreadJoinHandle,
};

use parking_lot::Mutex;
use tokio::runtime;
use tokio::task::JoinHandle;

use crate::{
    demand::Demand,
    errors::{panic_message, BoxError, Result, TapError},
    observer::{Completion, Observer},
};

/// A trait for publishers: types that can be subscribed to, delivering values and
/// a terminal [`Completion`] to a [`Subscriber`].
pub trait Subscribeable {
    /// The type of items emitted by the publisher.
    type ObsType;
    /// The failure type carried by [`Completion::Failure`].
    type ErrType;

    /// Subscribes to the publisher.
    ///
    /// Implementations must call the subscriber's `on_subscribe` exactly once
    /// before delivering anything else, even when the publisher is already
    /// exhausted and completes immediately. The returned `Subscription` is the
    /// same link the subscriber received.
    fn subscribe(&mut self, s: Subscriber<Self::ObsType, Self::ErrType>) -> Subscription;
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn<E> = Box<dyn FnMut(Completion<E>) + Send>;
type SubscribeFn = Box<dyn FnMut(&Subscription) + Send>;
type RequestFn = Arc<dyn Fn(Demand) + Send + Sync>;

/// A closure-backed [`Observer`] that enforces the subscriber contract.
///
/// Values arriving before `on_subscribe`, after the subscription has terminated,
/// or beyond the outstanding demand are dropped. The completion closure runs at
/// most once. Without an [`on_subscribed`](Subscriber::on_subscribed) closure the
/// subscriber requests [`Demand::Unlimited`] as soon as it is subscribed.
pub struct Subscriber<NextFnType, ErrorType = BoxError> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn<ErrorType>>,
    subscribe_fn: Option<SubscribeFn>,
    subscription: Option<Subscription>,
    completed: bool,
}

impl<NextFnType, ErrorType> Subscriber<NextFnType, ErrorType> {
    /// Creates a new `Subscriber` handling emitted values and the terminal signal.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        complete_fn: impl FnMut(Completion<ErrorType>) + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            subscribe_fn: None,
            subscription: None,
            completed: false,
        }
    }

    /// Create a new Subscriber with only the `next` function.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            subscribe_fn: None,
            subscription: None,
            completed: false,
        }
    }

    /// Set the function called with the terminal [`Completion`].
    pub fn on_complete(&mut self, complete_fn: impl FnMut(Completion<ErrorType>) + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the function called once the subscription is established.
    ///
    /// The closure takes over demand management: nothing is requested on its
    /// behalf, so it should call [`Subscription::request`] (now or later) for
    /// values to flow. Clone the subscription to keep it.
    pub fn on_subscribed(&mut self, subscribe_fn: impl FnMut(&Subscription) + 'static + Send) {
        self.subscribe_fn = Some(Box::new(subscribe_fn));
    }

    /// Request `demand` as soon as the subscription is established instead of
    /// the default unlimited demand.
    pub fn initial_demand(&mut self, demand: Demand) {
        self.on_subscribed(move |subscription| subscription.request(demand));
    }

    /// The subscription this subscriber received, if any.
    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }
}

impl<T, E> Observer for Subscriber<T, E> {
    type NextFnType = T;
    type ErrorType = E;

    fn on_subscribe(&mut self, subscription: Subscription) {
        if let Some(current) = &self.subscription {
            tracing::warn!(
                current = %current.id(),
                rejected = %subscription.id(),
                "subscriber is already subscribed, cancelling the new subscription"
            );
            subscription.cancel();
            return;
        }
        self.subscription = Some(subscription.clone());
        match &mut self.subscribe_fn {
            Some(sfn) => (sfn)(&subscription),
            None => subscription.request(Demand::Unlimited),
        }
    }

    fn next(&mut self, v: Self::NextFnType) {
        let Some(subscription) = &self.subscription else {
            tracing::warn!("value delivered before on_subscribe, dropping it");
            return;
        };
        if self.completed || !subscription.is_active() {
            tracing::trace!(subscription = %subscription.id(), "dropping value after termination");
            return;
        }
        if !subscription.take_one() {
            tracing::warn!(
                subscription = %subscription.id(),
                "value delivered without outstanding demand, dropping it"
            );
            return;
        }
        (self.next_fn)(v);
    }

    fn complete(&mut self, completion: Completion<Self::ErrorType>) {
        if self.completed {
            return;
        }
        let Some(subscription) = &self.subscription else {
            tracing::warn!("completion delivered before on_subscribe, dropping it");
            return;
        };
        if !subscription.mark_completed() {
            tracing::trace!(subscription = %subscription.id(), "dropping completion after cancel");
            return;
        }
        self.completed = true;
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)(completion);
        }
    }
}

/// Process-unique identifier of a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        SubscriptionId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enumeration representing different types of handles used to await
/// publishers that emit from a `Tokio` task or an OS thread.
pub enum SubscriptionHandle {
    /// Nothing to await.
    Nil,

    /// Holds a join handle for a publisher emitting from a `Tokio` task.
    JoinTask(JoinHandle<()>),

    /// Holds a join handle for a publisher emitting from an OS thread.
    JoinThread(ThreadJoinHandle<()>),
}

/// Enumerates the logic run when a subscription is cancelled.
pub enum CancelLogic {
    /// No specific cancel logic.
    Nil,

    /// Cancel another subscription this one depends on.
    Wrapped(Box<Subscription>),

    /// Cancel logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous cancel logic represented by a future. It is spawned on the
    /// `Tokio` runtime that was current when the subscription was created.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl CancelLogic {
    fn run(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            CancelLogic::Nil => (),
            CancelLogic::Logic(fnc) => fnc(),
            CancelLogic::Wrapped(subscription) => subscription.cancel(),
            CancelLogic::Future(future) => match runtime_handle {
                Some(handle) => {
                    handle.spawn(future);
                }
                None => {
                    tracing::error!(
                        "asynchronous cancel logic created outside of a Tokio runtime, skipping it"
                    );
                }
            },
        }
    }
}

const ACTIVE: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELLED: u8 = 2;

struct SubscriptionInner {
    id: SubscriptionId,
    state: AtomicU8,
    outstanding: Mutex<Demand>,
    request_logic: Mutex<Option<RequestFn>>,
    cancel_logic: Mutex<CancelLogic>,
    handle: Mutex<SubscriptionHandle>,
    runtime_handle: Option<runtime::Handle>,
}

/// The link between a publisher and one subscriber.
///
/// A `Subscription` is a cheap handle: clones refer to the same link, so it can be
/// returned from `subscribe`, handed to `on_subscribe` and moved to another
/// thread to cancel from there. The terminal state is a single atomic, so a value
/// racing with [`cancel`](Subscription::cancel) is discarded rather than delivered.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Creates a new `Subscription` with the specified cancel logic and handle.
    ///
    /// The `cancel_logic` runs once, on the first call to `cancel` made while the
    /// subscription is still active. The `subscription_future` holds a handle for
    /// awaiting the task or thread the publisher emits from.
    #[must_use]
    pub fn new(cancel_logic: CancelLogic, subscription_future: SubscriptionHandle) -> Self {
        Subscription {
            inner: Arc::new(SubscriptionInner {
                id: SubscriptionId::next(),
                state: AtomicU8::new(ACTIVE),
                outstanding: Mutex::new(Demand::none()),
                request_logic: Mutex::new(None),
                cancel_logic: Mutex::new(cancel_logic),
                handle: Mutex::new(subscription_future),
                runtime_handle: runtime::Handle::try_current().ok(),
            }),
        }
    }

    /// A subscription without cancel logic or handle.
    #[must_use]
    pub fn empty() -> Self {
        Subscription::new(CancelLogic::Nil, SubscriptionHandle::Nil)
    }

    /// Installs the logic run after each accepted `request`, receiving the
    /// individual demand of that call.
    ///
    /// The logic runs without any lock held, so it may trigger emission
    /// synchronously.
    #[must_use]
    pub fn with_request_logic(self, request_fn: impl Fn(Demand) + Send + Sync + 'static) -> Self {
        *self.inner.request_logic.lock() = Some(Arc::new(request_fn));
        self
    }

    /// Attaches the handle of the task or thread the publisher emits from.
    pub fn set_handle(&self, handle: SubscriptionHandle) {
        *self.inner.handle.lock() = handle;
    }

    /// Moves the join handle out, leaving `Nil`. Operators use it to make the
    /// subscription they return joinable.
    pub(crate) fn take_handle(&self) -> SubscriptionHandle {
        std::mem::replace(&mut *self.inner.handle.lock(), SubscriptionHandle::Nil)
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    /// Signals willingness to receive up to `demand` more values.
    ///
    /// Demand accumulates with [`Demand::combine`]. Requests made after the
    /// subscription terminated are ignored.
    pub fn request(&self, demand: Demand) {
        if !self.is_active() {
            return;
        }
        {
            let mut outstanding = self.inner.outstanding.lock();
            *outstanding = *outstanding + demand;
        }
        let request_fn = self.inner.request_logic.lock().clone();
        if let Some(request_fn) = request_fn {
            request_fn(demand);
        }
    }

    /// Stops delivery permanently.
    ///
    /// Only the first call on an active subscription has an effect: it runs the
    /// cancel logic. Later calls, and calls after completion, are no-ops.
    ///
    /// A publisher and its subscriber usually hold each other through the
    /// subscription's request logic. Cancelling (or completing) drops that logic
    /// and releases them; a subscription that is merely dropped while still
    /// active keeps them alive.
    pub fn cancel(&self) {
        if self
            .inner
            .state
            .compare_exchange(ACTIVE, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        // Dropped outside the lock, it may own the last reference to the publisher.
        let request_fn = self.inner.request_logic.lock().take();
        drop(request_fn);
        let logic = std::mem::replace(&mut *self.inner.cancel_logic.lock(), CancelLogic::Nil);
        logic.run(self.inner.runtime_handle.as_ref());
    }

    /// Demand not yet consumed by delivered values.
    #[must_use]
    pub fn outstanding(&self) -> Demand {
        *self.inner.outstanding.lock()
    }

    #[must_use]
    pub fn has_demand(&self) -> bool {
        !self.outstanding().is_zero()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == ACTIVE
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CANCELLED
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Consumes one unit of outstanding demand. Returns `false` if there was none.
    pub(crate) fn take_one(&self) -> bool {
        let mut outstanding = self.inner.outstanding.lock();
        if outstanding.is_zero() {
            return false;
        }
        *outstanding = outstanding.decrement();
        true
    }

    /// Moves the subscription into the completed state.
    ///
    /// Returns `false` if it was cancelled first, in which case the completion
    /// must not be delivered.
    pub(crate) fn mark_completed(&self) -> bool {
        match self.inner.state.compare_exchange(
            ACTIVE,
            COMPLETED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                let request_fn = self.inner.request_logic.lock().take();
                let cancel_logic =
                    std::mem::replace(&mut *self.inner.cancel_logic.lock(), CancelLogic::Nil);
                drop((request_fn, cancel_logic));
                true
            }
            Err(state) => state == COMPLETED,
        }
    }

    /// Awaits the task or thread the publisher emits from.
    ///
    /// Only the first join on a subscription (or any of its clones) waits; later
    /// joins return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::Join`] if the task or thread panicked or was aborted.
    pub async fn join_concurrent(self) -> Result<()> {
        let handle = self.take_handle();
        match handle {
            SubscriptionHandle::JoinTask(task_handle) => task_handle
                .await
                .map_err(|e| TapError::Join(e.to_string())),
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle
                .join()
                .map_err(|e| TapError::Join(panic_message(e.as_ref()))),
            SubscriptionHandle::Nil => Ok(()),
        }
    }

    /// Blocks until the OS thread the publisher emits from has finished.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::Join`] if the thread panicked, and
    /// [`TapError::JoinMismatch`] if the publisher runs on a `Tokio` task. Use
    /// `join_concurrent().await` for those.
    pub fn join(self) -> Result<()> {
        let mut guard = self.inner.handle.lock();
        if let SubscriptionHandle::JoinTask(_) = &*guard {
            return Err(TapError::JoinMismatch);
        }
        let handle = std::mem::replace(&mut *guard, SubscriptionHandle::Nil);
        drop(guard);
        match handle {
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle
                .join()
                .map_err(|e| TapError::Join(panic_message(e.as_ref()))),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("outstanding", &self.outstanding())
            .field("active", &self.is_active())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
