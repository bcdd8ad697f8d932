//! Filtered, observable message ports with streamed replies.
//!
//! msgport turns anything that can post and receive messages (channel ports,
//! workers, windows) into a uniform port you can filter, observe as a push
//! stream, and use for request/response: every request can carry its own
//! reply channel, and a handler's answer (one value, a sequence, or a
//! stream) is delivered over it and the channel closed afterwards.
//!
//! # Crate Structure
//!
//! - [`transport`]: Endpoint traits, event loop, in-memory message channels
//! - [`stream`]: Lazy push streams (observables), with an async adapter
//!   behind the `async` feature
//! - [`port`]: Port wrapper, filtering, stream exposure, reply protocol,
//!   window wrapper (behind `port` feature)

/// Re-export transport types.
pub mod transport {
    pub use msgport_transport::*;
}

/// Re-export push-stream types.
pub mod stream {
    pub use msgport_stream::*;
}

/// Re-export port types (requires `port` feature).
#[cfg(feature = "port")]
pub mod port {
    pub use msgport_port::*;
}
