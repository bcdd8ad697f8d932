use std::fmt;
use std::rc::Rc;

use crate::observer::{FnObserver, Observer};
use crate::subscription::{Subscription, SubscriptionObserver, SubscriptionState, Teardown};

type SubscriberFn<T, E> = dyn Fn(SubscriptionObserver<T, E>) -> Teardown;

/// A lazy push stream of `T` values that may fail with `E`.
///
/// Cloning is cheap and shares the subscriber function.
pub struct Observable<T, E> {
    subscriber: Rc<SubscriberFn<T, E>>,
}

impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self {
        Self {
            subscriber: Rc::clone(&self.subscriber),
        }
    }
}

impl<T, E> fmt::Debug for Observable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// Create an observable from a subscriber function, which runs once per
    /// subscription.
    pub fn new<F>(subscriber: F) -> Self
    where
        F: Fn(SubscriptionObserver<T, E>) -> Teardown + 'static,
    {
        Self {
            subscriber: Rc::new(subscriber),
        }
    }

    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Subscription {
        let state = Rc::new(SubscriptionState::new(Rc::new(observer)));
        let teardown = (self.subscriber)(SubscriptionObserver::new(Rc::clone(&state)));
        state.attach_teardown(teardown);
        Subscription::new(state)
    }

    /// Subscribe with only a `next` callback.
    pub fn subscribe_next(&self, f: impl Fn(T) + 'static) -> Subscription {
        self.subscribe(FnObserver::new().on_next(f))
    }

    /// Completes immediately without emitting.
    pub fn empty() -> Self {
        Self::new(|observer| {
            observer.complete();
            Teardown::noop()
        })
    }

    /// Transform each value.
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Observable<U, E> {
        let source = self.clone();
        let f: Rc<dyn Fn(T) -> U> = Rc::new(f);
        Observable::new(move |observer: SubscriptionObserver<U, E>| {
            let subscription = source.subscribe(MapObserver {
                downstream: observer,
                f: Rc::clone(&f),
            });
            Teardown::new(move || subscription.unsubscribe())
        })
    }
}

impl<T: Clone + 'static, E: 'static> Observable<T, E> {
    /// Emit each value in order, then complete.
    ///
    /// Stops early if the observer unsubscribes while values are being
    /// emitted.
    pub fn from_values(values: Vec<T>) -> Self {
        let values: Rc<[T]> = values.into();
        Self::new(move |observer| {
            for value in values.iter() {
                if observer.is_closed() {
                    return Teardown::noop();
                }
                observer.next(value.clone());
            }
            observer.complete();
            Teardown::noop()
        })
    }

    /// Emit one value, then complete.
    pub fn of(value: T) -> Self {
        Self::from_values(vec![value])
    }
}

impl<T: 'static, E: Clone + 'static> Observable<T, E> {
    /// Fail immediately with `error`.
    pub fn fail(error: E) -> Self {
        Self::new(move |observer| {
            observer.error(error.clone());
            Teardown::noop()
        })
    }
}

struct MapObserver<T, U, E> {
    downstream: SubscriptionObserver<U, E>,
    f: Rc<dyn Fn(T) -> U>,
}

impl<T, U, E> Observer<T, E> for MapObserver<T, U, E> {
    fn next(&self, value: T) {
        self.downstream.next((self.f)(value));
    }

    fn error(&self, error: E) {
        self.downstream.error(error);
    }

    fn complete(&self) {
        self.downstream.complete();
    }
}
