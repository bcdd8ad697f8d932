//! Endpoint abstraction for postMessage-shaped transports.
//!
//! Anything that can send a message and deliver "message" / "messageerror"
//! events can sit underneath msgport:
//! - [`Endpoint`] for ports and workers (`post_message(data, transfer)`)
//! - [`Window`] for window-like targets (`post_message(data, origin, transfer)`)
//!
//! This is the lowest layer of msgport. It also ships the in-memory
//! [`MessageChannel`] used to provision reply channels, driven by a
//! single-threaded [`EventLoop`].

pub mod channel;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod traits;

pub use channel::{ChannelConfig, MessageChannel, MessagePort, DEFAULT_MAX_PENDING};
pub use error::{Result, TransportError};
pub use event::{listener, listener_key, EventListener, EventType, Listener, MessageEvent};
pub use event_loop::EventLoop;
pub use traits::{Endpoint, Transferable, Window};
