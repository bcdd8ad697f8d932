//! In-memory message channels.
//!
//! A [`MessageChannel`] is a pair of entangled [`MessagePort`]s: posting on
//! one queues a `message` event on the other. Ports buffer inbound events
//! until started, so a port can be handed to another party (as a
//! transferable) before anyone listens on it without losing messages.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::{Result, TransportError};
use crate::event::{EventType, Listener, MessageEvent};
use crate::event_loop::EventLoop;
use crate::traits::{Endpoint, Transferable};

/// Default bound on undelivered messages per port.
pub const DEFAULT_MAX_PENDING: usize = 64 * 1024;

static NEXT_PORT_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for a channel pair.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Maximum number of undelivered messages a port holds before posts to
    /// it fail with [`TransportError::InboxFull`].
    pub max_pending: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

/// Two entangled ports.
#[derive(Debug)]
pub struct MessageChannel {
    pub port1: MessagePort,
    pub port2: MessagePort,
}

impl MessageChannel {
    /// Create a channel on this thread's [`EventLoop::current`].
    pub fn new() -> Self {
        Self::with_event_loop(&EventLoop::current())
    }

    pub fn with_event_loop(event_loop: &EventLoop) -> Self {
        Self::with_config(event_loop, ChannelConfig::default())
    }

    pub fn with_config(event_loop: &EventLoop, config: ChannelConfig) -> Self {
        let port1 = MessagePort::unentangled(event_loop.clone(), config.clone());
        let port2 = MessagePort::unentangled(event_loop.clone(), config);

        *port1.inner.peer.borrow_mut() = Rc::downgrade(&port2.inner);
        *port2.inner.peer.borrow_mut() = Rc::downgrade(&port1.inner);

        tracing::debug!(port1 = port1.id(), port2 = port2.id(), "channel created");
        Self { port1, port2 }
    }

    pub fn into_ports(self) -> (MessagePort, MessagePort) {
        (self.port1, self.port2)
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One half of a [`MessageChannel`]. Cloning yields another handle to the
/// same port.
#[derive(Clone)]
pub struct MessagePort {
    inner: Rc<PortState>,
}

struct PortState {
    id: u64,
    event_loop: EventLoop,
    config: ChannelConfig,
    peer: RefCell<Weak<PortState>>,
    listeners: RefCell<Vec<(EventType, Listener)>>,
    handlers: RefCell<HashMap<EventType, Listener>>,
    inbox: RefCell<VecDeque<MessageEvent>>,
    started: Cell<bool>,
    closed: Cell<bool>,
}

impl MessagePort {
    fn unentangled(event_loop: EventLoop, config: ChannelConfig) -> Self {
        Self {
            inner: Rc::new(PortState {
                id: NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed),
                event_loop,
                config,
                peer: RefCell::new(Weak::new()),
                listeners: RefCell::new(Vec::new()),
                handlers: RefCell::new(HashMap::new()),
                inbox: RefCell::new(VecDeque::new()),
                started: Cell::new(false),
                closed: Cell::new(false),
            }),
        }
    }

    /// Process-unique port id, for logs.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// True when both handles refer to the same port.
    pub fn same_port(&self, other: &MessagePort) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Messages received but not yet dispatched.
    pub fn pending(&self) -> usize {
        self.inner.inbox.borrow().len()
    }

    /// The loop this port delivers on.
    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    fn send(&self, kind: EventType, data: Value, transfer: Vec<Transferable>) -> Result<()> {
        if self.inner.closed.get() {
            tracing::trace!(port = self.id(), "post on closed port dropped");
            return Ok(());
        }

        let peer = self.inner.peer.borrow().upgrade();
        let Some(peer) = peer else {
            tracing::trace!(port = self.id(), "post without entangled peer dropped");
            return Ok(());
        };

        let mut ports = Vec::new();
        let mut buffers = Vec::new();
        for item in transfer {
            match item {
                Transferable::Port(port) => {
                    if Rc::ptr_eq(&port.inner, &self.inner) || Rc::ptr_eq(&port.inner, &peer) {
                        return Err(TransportError::DataClone);
                    }
                    ports.push(port);
                }
                Transferable::Buffer(buffer) => buffers.push(buffer),
            }
        }

        let event = MessageEvent {
            kind,
            data,
            origin: String::new(),
            ports,
            buffers,
        };
        MessagePort { inner: peer }.enqueue(event)
    }

    fn enqueue(&self, event: MessageEvent) -> Result<()> {
        if self.inner.closed.get() {
            return Ok(());
        }

        {
            let mut inbox = self.inner.inbox.borrow_mut();
            if inbox.len() >= self.inner.config.max_pending {
                return Err(TransportError::InboxFull {
                    capacity: self.inner.config.max_pending,
                });
            }
            inbox.push_back(event);
        }

        if self.inner.started.get() {
            self.schedule_dispatch();
        }
        Ok(())
    }

    fn schedule_dispatch(&self) {
        let port = self.clone();
        self.inner.event_loop.queue(move || port.dispatch_next());
    }

    fn dispatch_next(&self) {
        if self.inner.closed.get() {
            return;
        }
        let event = self.inner.inbox.borrow_mut().pop_front();
        if let Some(event) = event {
            tracing::trace!(port = self.id(), kind = %event.kind, "dispatching event");
            self.dispatch(&event);
        }
    }

    fn dispatch(&self, event: &MessageEvent) {
        let snapshot: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in snapshot {
            // Removed by an earlier listener during this dispatch.
            if !self.is_registered(event.kind, &listener) {
                continue;
            }
            listener.handle_event(event);
        }

        let handler = self.inner.handlers.borrow().get(&event.kind).cloned();
        if let Some(handler) = handler {
            handler.handle_event(event);
        }
    }

    fn is_registered(&self, kind: EventType, listener: &Listener) -> bool {
        self.inner
            .listeners
            .borrow()
            .iter()
            .any(|(k, l)| *k == kind && Rc::ptr_eq(l, listener))
    }

    fn begin_delivery(&self) {
        if self.inner.closed.get() || self.inner.started.replace(true) {
            return;
        }
        let queued = self.inner.inbox.borrow().len();
        tracing::trace!(port = self.id(), queued, "port started");
        for _ in 0..queued {
            self.schedule_dispatch();
        }
    }
}

impl Endpoint for MessagePort {
    fn post_message(&self, data: Value, transfer: Vec<Transferable>) -> Result<()> {
        self.send(EventType::Message, data, transfer)
    }

    fn add_event_listener(&self, kind: EventType, listener: Listener) {
        if self.is_registered(kind, &listener) {
            return;
        }
        self.inner.listeners.borrow_mut().push((kind, listener));
    }

    fn remove_event_listener(&self, kind: EventType, listener: &Listener) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(k, l)| !(*k == kind && Rc::ptr_eq(l, listener)));
    }

    fn handler(&self, kind: EventType) -> Option<Listener> {
        self.inner.handlers.borrow().get(&kind).cloned()
    }

    /// Assigning a message handler starts the port, as `onmessage` does.
    fn set_handler(&self, kind: EventType, handler: Option<Listener>) -> Result<()> {
        let starts = kind == EventType::Message && handler.is_some();
        match handler {
            Some(handler) => {
                self.inner.handlers.borrow_mut().insert(kind, handler);
            }
            None => {
                self.inner.handlers.borrow_mut().remove(&kind);
            }
        }
        if starts {
            self.begin_delivery();
        }
        Ok(())
    }

    fn supports_start(&self) -> bool {
        true
    }

    fn start(&self) -> Result<()> {
        self.begin_delivery();
        Ok(())
    }

    fn supports_close(&self) -> bool {
        true
    }

    fn close(&self) -> Result<()> {
        if self.inner.closed.replace(true) {
            return Ok(());
        }
        self.inner.inbox.borrow_mut().clear();
        *self.inner.peer.borrow_mut() = Weak::new();
        tracing::debug!(port = self.id(), "port closed");
        Ok(())
    }

    fn post_error(&self, reason: &str) -> Result<()> {
        self.send(
            EventType::MessageError,
            Value::String(reason.to_string()),
            Vec::new(),
        )
    }
}

impl fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePort")
            .field("id", &self.inner.id)
            .field("started", &self.inner.started.get())
            .field("closed", &self.inner.closed.get())
            .field("pending", &self.inner.inbox.borrow().len())
            .finish()
    }
}
