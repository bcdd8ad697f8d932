//! Recording test doubles for endpoints and windows.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use msgport_transport::{
    listener, Endpoint, EventType, Listener, MessageEvent, Result, Transferable, TransportError,
    Window,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Listen(EventType),
    Unlisten(EventType),
    Post(Value, usize),
    PostError(String),
    Start,
    Close,
}

/// Collects the data of every event it sees.
pub(crate) fn recorder() -> (Listener, Rc<RefCell<Vec<Value>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let l = listener(move |event| sink.borrow_mut().push(event.data.clone()));
    (l, seen)
}

#[derive(Default)]
struct Slots {
    listeners: RefCell<Vec<(EventType, Listener)>>,
    handlers: RefCell<HashMap<EventType, Listener>>,
}

impl Slots {
    fn add(&self, kind: EventType, listener: Listener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        if listeners
            .iter()
            .any(|(k, l)| *k == kind && Rc::ptr_eq(l, &listener))
        {
            return false;
        }
        listeners.push((kind, listener));
        true
    }

    fn remove(&self, kind: EventType, listener: &Listener) {
        self.listeners
            .borrow_mut()
            .retain(|(k, l)| !(*k == kind && Rc::ptr_eq(l, listener)));
    }

    fn count(&self, kind: EventType) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    fn set_handler(&self, kind: EventType, handler: Option<Listener>) {
        match handler {
            Some(handler) => {
                self.handlers.borrow_mut().insert(kind, handler);
            }
            None => {
                self.handlers.borrow_mut().remove(&kind);
            }
        }
    }

    /// Synchronous dispatch, listeners first, then the handler slot.
    fn emit(&self, event: &MessageEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(k, _)| *k == event.kind)
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for l in snapshot {
            l.handle_event(event);
        }
        let handler = self.handlers.borrow().get(&event.kind).cloned();
        if let Some(handler) = handler {
            handler.handle_event(event);
        }
    }
}

/// An endpoint that records every call made on it.
pub(crate) struct RecordingEndpoint {
    lifecycle: bool,
    calls: RefCell<Vec<Call>>,
    slots: Slots,
}

impl RecordingEndpoint {
    /// Supports start, close, error posting and handler slots.
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            lifecycle: true,
            calls: RefCell::new(Vec::new()),
            slots: Slots::default(),
        })
    }

    /// Only post and listeners.
    pub(crate) fn without_lifecycle() -> Rc<Self> {
        Rc::new(Self {
            lifecycle: false,
            calls: RefCell::new(Vec::new()),
            slots: Slots::default(),
        })
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls other than listener bookkeeping.
    pub(crate) fn traffic(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Listen(_) | Call::Unlisten(_)))
            .collect()
    }

    pub(crate) fn posts(&self) -> Vec<(Value, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Post(data, transfer) => Some((data, transfer)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn listener_count(&self, kind: EventType) -> usize {
        self.slots.count(kind)
    }

    pub(crate) fn emit(&self, event: MessageEvent) {
        self.slots.emit(&event);
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Endpoint for RecordingEndpoint {
    fn post_message(&self, data: Value, transfer: Vec<Transferable>) -> Result<()> {
        self.record(Call::Post(data, transfer.len()));
        Ok(())
    }

    fn add_event_listener(&self, kind: EventType, listener: Listener) {
        if self.slots.add(kind, listener) {
            self.record(Call::Listen(kind));
        }
    }

    fn remove_event_listener(&self, kind: EventType, listener: &Listener) {
        self.slots.remove(kind, listener);
        self.record(Call::Unlisten(kind));
    }

    fn handler(&self, kind: EventType) -> Option<Listener> {
        self.slots.handlers.borrow().get(&kind).cloned()
    }

    fn set_handler(&self, kind: EventType, handler: Option<Listener>) -> Result<()> {
        if !self.lifecycle {
            return Err(TransportError::Unsupported("set_handler"));
        }
        self.slots.set_handler(kind, handler);
        Ok(())
    }

    fn supports_start(&self) -> bool {
        self.lifecycle
    }

    fn start(&self) -> Result<()> {
        if !self.lifecycle {
            return Err(TransportError::Unsupported("start"));
        }
        self.record(Call::Start);
        Ok(())
    }

    fn supports_close(&self) -> bool {
        self.lifecycle
    }

    fn close(&self) -> Result<()> {
        if !self.lifecycle {
            return Err(TransportError::Unsupported("close"));
        }
        self.record(Call::Close);
        Ok(())
    }

    fn post_error(&self, reason: &str) -> Result<()> {
        if !self.lifecycle {
            return Err(TransportError::Unsupported("post_error"));
        }
        self.record(Call::PostError(reason.to_string()));
        Ok(())
    }
}

/// A window that records posts with their target origin.
#[derive(Default)]
pub(crate) struct RecordingWindow {
    posts: RefCell<Vec<(Value, String, usize)>>,
    slots: Slots,
}

impl RecordingWindow {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn posts(&self) -> Vec<(Value, String, usize)> {
        self.posts.borrow().clone()
    }

    pub(crate) fn listener_count(&self, kind: EventType) -> usize {
        self.slots.count(kind)
    }

    pub(crate) fn emit(&self, event: MessageEvent) {
        self.slots.emit(&event);
    }
}

impl Window for RecordingWindow {
    fn post_message(
        &self,
        data: Value,
        target_origin: &str,
        transfer: Vec<Transferable>,
    ) -> Result<()> {
        self.posts
            .borrow_mut()
            .push((data, target_origin.to_string(), transfer.len()));
        Ok(())
    }

    fn add_event_listener(&self, kind: EventType, listener: Listener) {
        self.slots.add(kind, listener);
    }

    fn remove_event_listener(&self, kind: EventType, listener: &Listener) {
        self.slots.remove(kind, listener);
    }

    fn handler(&self, kind: EventType) -> Option<Listener> {
        self.slots.handlers.borrow().get(&kind).cloned()
    }

    fn set_handler(&self, kind: EventType, handler: Option<Listener>) -> Result<()> {
        self.slots.set_handler(kind, handler);
        Ok(())
    }
}
