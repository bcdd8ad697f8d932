use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::observer::Observer;

/// Undoes whatever a subscriber function wired up.
pub struct Teardown(Option<Box<dyn FnOnce()>>);

impl Teardown {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A teardown with nothing to undo.
    pub fn noop() -> Self {
        Self(None)
    }

    pub(crate) fn run(self) {
        if let Some(f) = self.0 {
            f();
        }
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Teardown").field(&self.0.is_some()).finish()
    }
}

pub(crate) struct SubscriptionState<T, E> {
    observer: RefCell<Option<Rc<dyn Observer<T, E>>>>,
    teardown: RefCell<Option<Teardown>>,
    closed: Cell<bool>,
}

impl<T, E> SubscriptionState<T, E> {
    pub(crate) fn new(observer: Rc<dyn Observer<T, E>>) -> Self {
        Self {
            observer: RefCell::new(Some(observer)),
            teardown: RefCell::new(None),
            closed: Cell::new(false),
        }
    }

    /// Close the subscription and hand back the observer for one final call.
    fn close(&self) -> Option<Rc<dyn Observer<T, E>>> {
        if self.closed.replace(true) {
            return None;
        }
        self.observer.borrow_mut().take()
    }

    fn cleanup(&self) {
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown.run();
        }
    }

    /// Store the subscriber's teardown, or run it now if the subscription
    /// already closed while the subscriber was running.
    pub(crate) fn attach_teardown(&self, teardown: Teardown) {
        if self.closed.get() {
            teardown.run();
        } else {
            *self.teardown.borrow_mut() = Some(teardown);
        }
    }
}

trait Unsubscribe {
    fn unsubscribe(&self);
    fn is_closed(&self) -> bool;
}

impl<T, E> Unsubscribe for SubscriptionState<T, E> {
    fn unsubscribe(&self) {
        if self.close().is_some() {
            self.cleanup();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Handle to an active subscription. Dropping it does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    state: Rc<dyn Unsubscribe>,
}

impl Subscription {
    pub(crate) fn new<T: 'static, E: 'static>(state: Rc<SubscriptionState<T, E>>) -> Self {
        Self { state }
    }

    /// Stop receiving notifications and run the teardown. Idempotent.
    pub fn unsubscribe(&self) {
        self.state.unsubscribe();
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The producer side of a subscription, handed to subscriber functions.
pub struct SubscriptionObserver<T, E> {
    state: Rc<SubscriptionState<T, E>>,
}

impl<T, E> Clone for SubscriptionObserver<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T, E> SubscriptionObserver<T, E> {
    pub(crate) fn new(state: Rc<SubscriptionState<T, E>>) -> Self {
        Self { state }
    }

    pub fn next(&self, value: T) {
        if self.state.closed.get() {
            return;
        }
        let observer = self.state.observer.borrow().clone();
        if let Some(observer) = observer {
            observer.next(value);
        }
    }

    pub fn error(&self, error: E) {
        if let Some(observer) = self.state.close() {
            observer.error(error);
            self.state.cleanup();
        }
    }

    pub fn complete(&self) {
        if let Some(observer) = self.state.close() {
            observer.complete();
            self.state.cleanup();
        }
    }

    /// True once the subscription was completed, failed, or unsubscribed.
    pub fn is_closed(&self) -> bool {
        self.state.closed.get()
    }
}
