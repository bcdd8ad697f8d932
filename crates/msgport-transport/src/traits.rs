use bytes::Bytes;
use serde_json::Value;

use crate::channel::MessagePort;
use crate::error::{Result, TransportError};
use crate::event::{EventType, Listener};

/// An object handed over with a message rather than copied.
#[derive(Debug, Clone)]
pub enum Transferable {
    /// One half of a message channel.
    Port(MessagePort),
    /// An opaque byte buffer.
    Buffer(Bytes),
}

impl From<MessagePort> for Transferable {
    fn from(port: MessagePort) -> Self {
        Transferable::Port(port)
    }
}

impl From<Bytes> for Transferable {
    fn from(buffer: Bytes) -> Self {
        Transferable::Buffer(buffer)
    }
}

/// Capability contract for port-like endpoints (message ports, workers).
///
/// Only sending and listener registration are required. The remaining
/// capabilities report [`TransportError::Unsupported`] unless the endpoint
/// provides them; callers check `supports_*` first.
pub trait Endpoint {
    /// Send `data`, handing over the listed transferables.
    fn post_message(&self, data: Value, transfer: Vec<Transferable>) -> Result<()>;

    /// Register a listener. Registering the same `Rc` twice is a no-op.
    fn add_event_listener(&self, kind: EventType, listener: Listener);

    /// Remove a listener previously registered with the same `Rc`.
    fn remove_event_listener(&self, kind: EventType, listener: &Listener);

    /// Current single-slot handler (`onmessage` / `onmessageerror`).
    fn handler(&self, _kind: EventType) -> Option<Listener> {
        None
    }

    /// Replace the single-slot handler. `None` clears it.
    fn set_handler(&self, _kind: EventType, _handler: Option<Listener>) -> Result<()> {
        Err(TransportError::Unsupported("set_handler"))
    }

    fn supports_start(&self) -> bool {
        false
    }

    /// Begin delivering queued events.
    fn start(&self) -> Result<()> {
        Err(TransportError::Unsupported("start"))
    }

    fn supports_close(&self) -> bool {
        false
    }

    /// Disconnect the endpoint.
    fn close(&self) -> Result<()> {
        Err(TransportError::Unsupported("close"))
    }

    /// Deliver a `messageerror` event carrying `reason` to the far side.
    fn post_error(&self, _reason: &str) -> Result<()> {
        Err(TransportError::Unsupported("post_error"))
    }
}

/// Capability contract for window-like targets, whose send primitive
/// names the origin the message is intended for.
pub trait Window {
    fn post_message(&self, data: Value, target_origin: &str, transfer: Vec<Transferable>)
        -> Result<()>;

    fn add_event_listener(&self, kind: EventType, listener: Listener);

    fn remove_event_listener(&self, kind: EventType, listener: &Listener);

    fn handler(&self, _kind: EventType) -> Option<Listener> {
        None
    }

    fn set_handler(&self, _kind: EventType, _handler: Option<Listener>) -> Result<()> {
        Err(TransportError::Unsupported("set_handler"))
    }
}
