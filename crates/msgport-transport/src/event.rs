//! Message events and listener identity.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::Value;

use crate::channel::MessagePort;
use crate::error::TransportError;

/// Event types an endpoint delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A message arrived.
    Message,
    /// A message arrived but could not be delivered as data.
    MessageError,
}

impl EventType {
    /// Both event types, in registration order.
    pub const ALL: [EventType; 2] = [EventType::Message, EventType::MessageError];

    /// The DOM-style event name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::MessageError => "messageerror",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(EventType::Message),
            "messageerror" => Ok(EventType::MessageError),
            other => Err(TransportError::UnknownEventType(other.to_string())),
        }
    }
}

/// An event delivered by an endpoint.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub kind: EventType,
    pub data: Value,
    /// Origin of the sender. Empty for channel ports.
    pub origin: String,
    /// Ports transferred with the message, in transfer order.
    pub ports: Vec<MessagePort>,
    /// Buffers transferred with the message, in transfer order.
    pub buffers: Vec<Bytes>,
}

impl MessageEvent {
    /// Create a `message` event carrying `data`.
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            kind: EventType::Message,
            data: data.into(),
            origin: String::new(),
            ports: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Create a `messageerror` event carrying `data`.
    pub fn error(data: impl Into<Value>) -> Self {
        Self {
            kind: EventType::MessageError,
            ..Self::new(data)
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_ports(mut self, ports: Vec<MessagePort>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_buffers(mut self, buffers: Vec<Bytes>) -> Self {
        self.buffers = buffers;
        self
    }

    /// The first transferred port, which carries replies by convention.
    pub fn reply_port(&self) -> Option<&MessagePort> {
        self.ports.first()
    }
}

/// Receives events from an endpoint.
///
/// Closures `Fn(&MessageEvent)` implement this directly; structs can
/// implement it to act as "handleEvent" objects.
pub trait EventListener {
    fn handle_event(&self, event: &MessageEvent);
}

impl<F> EventListener for F
where
    F: Fn(&MessageEvent),
{
    fn handle_event(&self, event: &MessageEvent) {
        self(event)
    }
}

/// A registered listener. Identity is the `Rc` allocation, so registering
/// and removing must use clones of the same `Rc`.
pub type Listener = Rc<dyn EventListener>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&MessageEvent) + 'static,
{
    Rc::new(f)
}

/// Identity key for a listener (its allocation address).
pub fn listener_key(listener: &Listener) -> usize {
    Rc::as_ptr(listener) as *const () as usize
}
