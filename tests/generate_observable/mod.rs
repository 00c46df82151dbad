use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rxtap::{
    subscribe::{CancelLogic, Subscriber, Subscription, SubscriptionHandle},
    Completion, Observable, Observer,
};

/// Publisher emitting `0..=end` from an OS thread, one value per unit of demand.
///
/// It keeps calling `complete` even after a cancel so tests can check that the
/// completion is discarded. `last_emit_assert` receives the last value the
/// thread tried to emit.
pub fn generate_u32_observable(
    end: u32,
    last_emit_assert: impl FnMut(u32) + Send + Sync + 'static,
) -> Observable<u32> {
    let last_emit_assert = Arc::new(Mutex::new(last_emit_assert));

    Observable::new(move |mut o: Subscriber<u32>| {
        let subscription = Subscription::new(CancelLogic::Nil, SubscriptionHandle::Nil);
        o.on_subscribe(subscription.clone());

        let s = subscription.clone();
        let last_emit_assert = Arc::clone(&last_emit_assert);
        let jh = std::thread::spawn(move || {
            let mut last_emit = 0;

            for i in 0..=end {
                while s.is_active() && !s.has_demand() {
                    std::thread::sleep(Duration::from_millis(1));
                }
                if !s.is_active() {
                    break;
                }
                last_emit = i;
                o.next(i);
                // Important. Put an await point after each emit.
                std::thread::sleep(Duration::from_millis(1));
            }
            o.complete(Completion::Finished);
            last_emit_assert.lock().unwrap()(last_emit);
        });

        subscription.set_handle(SubscriptionHandle::JoinThread(jh));
        subscription
    })
}

/// Publisher that ignores cancellation and demand and pushes `values` followed
/// by `Finished` straight into the subscriber.
pub fn reckless_observable(values: Vec<&'static str>) -> Observable<&'static str> {
    Observable::new(move |mut o: Subscriber<&'static str>| {
        let subscription = Subscription::empty();
        o.on_subscribe(subscription.clone());
        for v in values.iter().copied() {
            o.next(v);
        }
        o.complete(Completion::Finished);
        subscription
    })
}
