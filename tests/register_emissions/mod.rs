use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
};

use rxtap::{subscribe::Subscriber, BoxError, Completion, Demand, Subscription, TapObservers};

/// Everything that happened around one tapped subscription, in order.
///
/// `Observed*` entries come from the tap's observers, the rest from the
/// subscriber. A completion is `None` for `Finished` and the error message for a
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission<T> {
    ObservedSubscribe,
    ObservedValue(T),
    ObservedComplete(Option<String>),
    ObservedCancel,
    ObservedRequest(Demand),
    Subscribed,
    Value(T),
    Completed(Option<String>),
}

pub type EmissionLog<T> = Arc<Mutex<Vec<Emission<T>>>>;

fn completion_entry(c: &Completion<BoxError>) -> Option<String> {
    match c {
        Completion::Finished => None,
        Completion::Failure(e) => Some(e.to_string()),
    }
}

/// Tap observers recording all five lifecycle events into `log`.
pub fn register_observers<T>(log: &EmissionLog<T>) -> TapObservers<T>
where
    T: Clone + Debug + Send + 'static,
{
    let log_s = Arc::clone(log);
    let log_v = Arc::clone(log);
    let log_c = Arc::clone(log);
    let log_x = Arc::clone(log);
    let log_r = Arc::clone(log);

    TapObservers::new()
        .on_subscribe(move |_| log_s.lock().unwrap().push(Emission::ObservedSubscribe))
        .on_value(move |v: &T| log_v.lock().unwrap().push(Emission::ObservedValue(v.clone())))
        .on_complete(move |c| {
            log_c
                .lock()
                .unwrap()
                .push(Emission::ObservedComplete(completion_entry(c)))
        })
        .on_cancel(move || log_x.lock().unwrap().push(Emission::ObservedCancel))
        .on_request(move |d| log_r.lock().unwrap().push(Emission::ObservedRequest(d)))
}

/// Subscriber recording into `log`, requesting `demand` when subscribed and
/// storing its subscription in the returned slot.
pub fn register_subscriber<T>(
    log: &EmissionLog<T>,
    demand: Demand,
) -> (Subscriber<T>, Arc<Mutex<Option<Subscription>>>)
where
    T: Clone + Debug + Send + 'static,
{
    let held = Arc::new(Mutex::new(None));
    let held_c = Arc::clone(&held);
    let log_s = Arc::clone(log);
    let log_v = Arc::clone(log);
    let log_c = Arc::clone(log);

    let mut s = Subscriber::new(
        move |v: T| log_v.lock().unwrap().push(Emission::Value(v)),
        move |c: Completion<BoxError>| {
            log_c
                .lock()
                .unwrap()
                .push(Emission::Completed(completion_entry(&c)))
        },
    );
    s.on_subscribed(move |subscription| {
        log_s.lock().unwrap().push(Emission::Subscribed);
        *held_c.lock().unwrap() = Some(subscription.clone());
        if !demand.is_zero() {
            subscription.request(demand);
        }
    });
    (s, held)
}

pub fn count<T: PartialEq>(log: &EmissionLog<T>, emission: &Emission<T>) -> usize {
    log.lock().unwrap().iter().filter(|e| *e == emission).count()
}
