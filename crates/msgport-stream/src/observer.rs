/// Receives notifications from an [`Observable`](crate::Observable).
pub trait Observer<T, E> {
    fn next(&self, value: T);

    /// The source failed. No further notifications follow.
    fn error(&self, _error: E) {
        tracing::trace!("observer has no error callback; error dropped");
    }

    /// The source finished. No further notifications follow.
    fn complete(&self) {}
}

type NextFn<T> = Box<dyn Fn(T)>;
type ErrorFn<E> = Box<dyn Fn(E)>;
type CompleteFn = Box<dyn Fn()>;

/// An [`Observer`] assembled from optional callbacks.
///
/// ```
/// use msgport_stream::{FnObserver, Observable};
///
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// Observable::<i32, ()>::from_values(vec![1, 2])
///     .subscribe(FnObserver::new().on_next(move |v: i32| sink.borrow_mut().push(v)));
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// ```
pub struct FnObserver<T, E> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn<E>>,
    complete: Option<CompleteFn>,
}

impl<T, E> FnObserver<T, E> {
    pub fn new() -> Self {
        Self {
            next: None,
            error: None,
            complete: None,
        }
    }

    pub fn on_next(mut self, f: impl Fn(T) + 'static) -> Self {
        self.next = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(E) + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn() + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl<T, E> Default for FnObserver<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Observer<T, E> for FnObserver<T, E> {
    fn next(&self, value: T) {
        if let Some(next) = &self.next {
            next(value);
        }
    }

    fn error(&self, error: E) {
        match &self.error {
            Some(on_error) => on_error(error),
            None => tracing::trace!("observer has no error callback; error dropped"),
        }
    }

    fn complete(&self) {
        if let Some(complete) = &self.complete {
            complete();
        }
    }
}
