use std::rc::Rc;

use msgport_stream::{Observable, Observer, Subscription, SubscriptionObserver, Teardown};
use msgport_transport::{listener, EventType, MessageEvent};

use crate::port::Port;

/// Inbound `message` events as values, `messageerror` events as errors.
pub type MessageObservable = Observable<MessageEvent, MessageEvent>;

impl Port {
    /// The port's event stream. Built on first access and reused after.
    ///
    /// Each subscription registers one `message` and one `messageerror`
    /// listener; if the port autostarts and its endpoint can start, the
    /// endpoint is started once those listeners are in place. Unsubscribing
    /// removes both listeners. An active subscription keeps the port alive.
    pub fn messages(&self) -> MessageObservable {
        self.inner
            .messages
            .get_or_init(|| {
                let weak = Rc::downgrade(&self.inner);
                Observable::new(
                    move |observer: SubscriptionObserver<MessageEvent, MessageEvent>| {
                        let Some(inner) = weak.upgrade() else {
                            observer.complete();
                            return Teardown::noop();
                        };
                        attach(Port { inner }, observer)
                    },
                )
            })
            .clone()
    }

    pub fn subscribe(
        &self,
        observer: impl Observer<MessageEvent, MessageEvent> + 'static,
    ) -> Subscription {
        self.messages().subscribe(observer)
    }

    /// Subscribe to `message` events only.
    pub fn subscribe_next(&self, f: impl Fn(MessageEvent) + 'static) -> Subscription {
        self.messages().subscribe_next(f)
    }

    /// The event stream as an async `Stream`.
    #[cfg(feature = "async")]
    pub fn message_stream(&self) -> msgport_stream::ObservableStream<MessageEvent, MessageEvent> {
        self.messages().into_stream()
    }
}

fn attach(port: Port, observer: SubscriptionObserver<MessageEvent, MessageEvent>) -> Teardown {
    let on_message = {
        let observer = observer.clone();
        listener(move |event| observer.next(event.clone()))
    };
    let on_error = listener(move |event| observer.error(event.clone()));

    port.add_event_listener(EventType::Message, Rc::clone(&on_message));
    port.add_event_listener(EventType::MessageError, Rc::clone(&on_error));

    if port.autostart() && port.can_start() {
        if let Err(err) = port.start() {
            tracing::warn!(error = %err, "failed to start port on subscribe");
        }
    }

    Teardown::new(move || {
        port.remove_event_listener(EventType::Message, &on_message);
        port.remove_event_listener(EventType::MessageError, &on_error);
    })
}
