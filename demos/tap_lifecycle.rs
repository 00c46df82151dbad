/**
 * Taps a synchronous `Observable` with all five lifecycle observers and pulls values
 * in batches of two, cancelling once five values have arrived. The observers print
 * each event before it reaches the subscriber.
 */
use std::sync::{Arc, Mutex};

use rxtap::{
    subscribe::{Subscriber, Subscription},
    Completion, Demand, Observable, ObservableExt, Subscribeable, TapObservers,
};

fn main() {
    let observers = TapObservers::new()
        .on_subscribe(|id| println!("[tap] subscribed {}", id))
        .on_request(|d| println!("[tap] requested {}", d))
        .on_value(|v: &u32| println!("[tap] value {}", v))
        .on_complete(|c| println!("[tap] completed, finished: {}", c.is_finished()))
        .on_cancel(|| println!("[tap] cancelled"));

    let mut observable = Observable::<u32>::from_iter(1..=100).tap(observers);

    // Keep the subscription around so `next` can ask for more or stop.
    let held: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let held_n = Arc::clone(&held);
    let held_s = Arc::clone(&held);

    let mut subscriber = Subscriber::new(
        move |v: u32| {
            println!("Emitted {}", v);
            let Some(subscription) = held_n.lock().unwrap().clone() else {
                return;
            };
            if v == 5 {
                subscription.cancel();
            } else if v % 2 == 0 {
                subscription.request(Demand::Count(2));
            }
        },
        |c: Completion<_>| println!("Completed: {}", c.is_finished()),
    );
    // Start with a batch of two instead of unlimited demand.
    subscriber.on_subscribed(move |subscription| {
        *held_s.lock().unwrap() = Some(subscription.clone());
        subscription.request(Demand::Count(2));
    });

    let subscription = observable.subscribe(subscriber);
    println!("cancelled: {}", subscription.is_cancelled());
}
