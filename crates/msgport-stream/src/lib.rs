//! Lazy push streams for single-threaded event delivery.
//!
//! An [`Observable`] does nothing until subscribed. Each subscription runs
//! the observable's subscriber function once, which wires up a source and
//! returns a [`Teardown`] that undoes the wiring. Values, errors and
//! completion are pushed to the subscribed [`Observer`] as they happen.
//!
//! - After `error` or `complete` a subscription is closed and its teardown
//!   has run exactly once.
//! - [`Subscription::unsubscribe`] runs the teardown synchronously.

pub mod observable;
pub mod observer;
pub mod subscription;

#[cfg(feature = "async")]
pub mod stream;

pub use observable::Observable;
pub use observer::{FnObserver, Observer};
pub use subscription::{Subscription, SubscriptionObserver, Teardown};

#[cfg(feature = "async")]
pub use stream::ObservableStream;
