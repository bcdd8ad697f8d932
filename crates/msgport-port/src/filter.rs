//! Event filtering and listener bookkeeping.
//!
//! Each [`Port`] owns a filter table (one predicate per event type) and a
//! registry mapping the listener a caller handed in to the listener that was
//! actually registered below it. Filter views wrap their parent, so the
//! parent's predicates keep applying underneath the view's own.

use std::collections::HashMap;
use std::rc::Rc;

use msgport_transport::{listener, listener_key, EventListener, EventType, Listener, MessageEvent};

use crate::error::Result;
use crate::port::{Port, Wrapped};

/// Decides whether an event reaches listeners on a filtered port.
pub type Predicate = Rc<dyn Fn(&MessageEvent) -> bool>;

#[derive(Default)]
pub(crate) struct FilterTable {
    entries: HashMap<EventType, Predicate>,
}

impl FilterTable {
    pub(crate) fn get(&self, kind: EventType) -> Option<Predicate> {
        self.entries.get(&kind).cloned()
    }

    pub(crate) fn set(&mut self, kind: EventType, predicate: Predicate) {
        self.entries.insert(kind, predicate);
    }

    pub(crate) fn kinds(&self) -> Vec<EventType> {
        EventType::ALL
            .into_iter()
            .filter(|kind| self.entries.contains_key(kind))
            .collect()
    }
}

struct FilteredListener {
    predicate: Predicate,
    listener: Listener,
}

impl EventListener for FilteredListener {
    fn handle_event(&self, event: &MessageEvent) {
        if (self.predicate)(event) {
            self.listener.handle_event(event);
        }
    }
}

struct Registration {
    caller: Listener,
    registered: Listener,
}

impl Registration {
    fn is_for(&self, listener: &Listener) -> bool {
        Rc::ptr_eq(&self.caller, listener)
    }
}

/// Caller listener -> registered listener, per event type.
///
/// Keys are listener addresses. Every entry owns its caller listener (the
/// registered listener wraps it anyway), so an address stays taken until
/// the entry is removed and can never alias a different listener.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    by_kind: HashMap<EventType, HashMap<usize, Registration>>,
}

impl ListenerRegistry {
    pub(crate) fn lookup(&self, kind: EventType, listener: &Listener) -> Option<Listener> {
        self.by_kind
            .get(&kind)?
            .get(&listener_key(listener))
            .filter(|registration| registration.is_for(listener))
            .map(|registration| Rc::clone(&registration.registered))
    }

    pub(crate) fn insert(&mut self, kind: EventType, caller: &Listener, registered: Listener) {
        self.by_kind.entry(kind).or_default().insert(
            listener_key(caller),
            Registration {
                caller: Rc::clone(caller),
                registered,
            },
        );
    }

    pub(crate) fn remove(&mut self, kind: EventType, listener: &Listener) -> Option<Listener> {
        let entries = self.by_kind.get_mut(&kind)?;
        let key = listener_key(listener);
        if !entries.get(&key)?.is_for(listener) {
            return None;
        }
        entries.remove(&key).map(|registration| registration.registered)
    }

    #[cfg(test)]
    pub(crate) fn len(&self, kind: EventType) -> usize {
        self.by_kind.get(&kind).map_or(0, HashMap::len)
    }
}

impl Port {
    /// A view of this port whose `message` listeners only see events
    /// accepted by `predicate`.
    pub fn filter(&self, predicate: impl Fn(&MessageEvent) -> bool + 'static) -> Port {
        self.filter_event(EventType::Message, predicate)
    }

    /// A view of this port filtering events of `kind`.
    ///
    /// The view is built with this port's factory around this port, starts
    /// with an empty table holding just `predicate`, and does not autostart.
    pub fn filter_event(
        &self,
        kind: EventType,
        predicate: impl Fn(&MessageEvent) -> bool + 'static,
    ) -> Port {
        let view = self.wrap_port(self.clone());
        view.set_autostart(false);
        view.set_filter(kind, Rc::new(predicate));
        view
    }

    pub(crate) fn set_filter(&self, kind: EventType, predicate: Predicate) {
        self.inner.filters.borrow_mut().set(kind, predicate);
    }

    /// The listener to register below this port for `listener`.
    fn gate(&self, kind: EventType, listener: &Listener) -> Listener {
        let predicate = self.inner.filters.borrow().get(kind);
        match predicate {
            Some(predicate) => {
                let gated: Listener = Rc::new(FilteredListener {
                    predicate,
                    listener: Rc::clone(listener),
                });
                gated
            }
            None => Rc::clone(listener),
        }
    }

    /// Register `listener` for `kind`. Registering the same listener again
    /// is a no-op.
    pub fn add_event_listener(&self, kind: EventType, listener: Listener) {
        if self.inner.listeners.borrow().lookup(kind, &listener).is_some() {
            return;
        }
        let registered = self.gate(kind, &listener);
        self.inner
            .listeners
            .borrow_mut()
            .insert(kind, &listener, Rc::clone(&registered));

        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.add_event_listener(kind, registered),
            Wrapped::Window { window, .. } => window.add_event_listener(kind, registered),
            Wrapped::Port(parent) => parent.add_event_listener(kind, registered),
        }
    }

    /// Remove exactly the listener registered for `listener`, if any.
    pub fn remove_event_listener(&self, kind: EventType, listener: &Listener) {
        let registered = self.inner.listeners.borrow_mut().remove(kind, listener);
        let Some(registered) = registered else {
            return;
        };

        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.remove_event_listener(kind, &registered),
            Wrapped::Window { window, .. } => window.remove_event_listener(kind, &registered),
            Wrapped::Port(parent) => parent.remove_event_listener(kind, &registered),
        }
    }

    /// The single-slot handler currently installed for `kind`.
    pub fn handler(&self, kind: EventType) -> Option<Listener> {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.handler(kind),
            Wrapped::Window { window, .. } => window.handler(kind),
            Wrapped::Port(parent) => parent.handler(kind),
        }
    }

    /// Install (or clear) the single-slot handler for `kind`, gated by this
    /// port's filter. Replaces any handler set this way; listeners added
    /// with [`add_event_listener`](Self::add_event_listener) are untouched.
    pub fn set_handler(&self, kind: EventType, handler: Option<Listener>) -> Result<()> {
        let handler = handler.map(|handler| self.gate(kind, &handler));
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.set_handler(kind, handler)?,
            Wrapped::Window { window, .. } => window.set_handler(kind, handler)?,
            Wrapped::Port(parent) => parent.set_handler(kind, handler)?,
        }
        Ok(())
    }

    pub fn set_message_handler(&self, f: impl Fn(&MessageEvent) + 'static) -> Result<()> {
        self.set_handler(EventType::Message, Some(listener(f)))
    }

    pub fn set_error_handler(&self, f: impl Fn(&MessageEvent) + 'static) -> Result<()> {
        self.set_handler(EventType::MessageError, Some(listener(f)))
    }
}
