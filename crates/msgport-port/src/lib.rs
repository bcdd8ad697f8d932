//! Port wrappers with filtering, push-stream exposure and reply channels.
//!
//! This is the "just works" layer. Wrap any endpoint (or a window plus the
//! origin you talk to) in a [`Port`], derive filtered views of it, observe
//! its events as a lazy stream, and answer inbound messages with a single
//! value, a sequence, or a stream over an automatically provisioned reply
//! channel.

pub mod config;
pub mod error;
pub mod filter;
pub mod message;
pub mod observe;
pub mod port;
pub mod reply;
pub mod response;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use config::PortConfig;
pub use error::{HandlerError, PortError, Result};
pub use filter::Predicate;
pub use message::Message;
pub use observe::MessageObservable;
pub use port::{try_wrap, wrap, Port, WrapPortFn, Wrapped};
pub use reply::ReplyState;
pub use response::{Response, ResponseStream};
pub use window::{wrap_window, WindowOptions, ANY_ORIGIN};

pub use msgport_stream::{FnObserver, Observable, Observer, Subscription};
pub use msgport_transport::{
    EventListener, EventType, Listener, MessageChannel, MessageEvent, MessagePort, Transferable,
};
