//! Provides structures and traits related to subscription management.
//!
//! This module includes the `Subscriber` type for handling delivered values and
//! the terminal signal, and `Subscription` for requesting demand from and
//! cancelling a publisher.
//!
//! Additionally, it defines the enums describing cancel logic and the handles
//! used to await publishers that emit from a `Tokio` task or an OS thread.
pub mod subscribe;
