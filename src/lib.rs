//! Demand-driven publishers with non-transforming lifecycle event taps.
//!
//! A publisher ([`Subscribeable`]) delivers values and one terminal
//! [`Completion`] to a [`Subscriber`], which controls the flow through its
//! [`Subscription`]: it asks for more values with `request(Demand)` and stops the
//! stream with `cancel()`.
//!
//! The [`EventTap`] operator wraps any publisher and lets the host observe the
//! five lifecycle events of each subscription (subscribe, value, completion,
//! cancel and request) with side-effecting callbacks. Observers see the events
//! before they are forwarded and can never alter them.
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//!
//! use rxtap::{subscribe::Subscriber, Demand, Observable, ObservableExt, Subscribeable, TapObservers};
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let log_v = Arc::clone(&log);
//! let log_c = Arc::clone(&log);
//!
//! let mut stream = Observable::<&str>::from_iter(vec!["a", "b"]).tap(
//!     TapObservers::new()
//!         .on_value(move |v: &&str| log_v.lock().unwrap().push(format!("value {}", v)))
//!         .on_complete(move |_| log_c.lock().unwrap().push("complete".to_owned())),
//! );
//!
//! let mut subscriber = Subscriber::on_next(|v| println!("{}", v));
//! subscriber.initial_demand(Demand::Unlimited);
//! stream.subscribe(subscriber);
//! ```

mod demand;
mod errors;
mod observable;
pub mod observer;
mod subscription;

pub use demand::Demand;
pub use errors::*;
pub use observable::diagnostics::{DiagnosticSink, TracingSink};
pub use observable::*;
pub use observer::{Completion, Observer};
pub use subscription::*;
pub use subscription::subscribe::{Subscribeable, Subscription, SubscriptionId};
