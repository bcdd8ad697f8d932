use std::fmt;

use msgport_transport::{ChannelConfig, EventLoop};

use crate::port::WrapPortFn;

/// Behaviour config for a [`Port`](crate::Port).
#[derive(Clone)]
pub struct PortConfig {
    /// Start the wrapped endpoint when the message stream is subscribed.
    pub autostart: bool,
    /// Constructor for filter views and reply ports. `None` builds plain
    /// ports that inherit this config's event loop and channel settings.
    pub wrap_port: Option<WrapPortFn>,
    /// Loop that reply channels deliver on. `None` uses
    /// [`EventLoop::current`].
    pub event_loop: Option<EventLoop>,
    /// Settings for provisioned reply channels.
    pub channel: ChannelConfig,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            autostart: true,
            wrap_port: None,
            event_loop: None,
            channel: ChannelConfig::default(),
        }
    }
}

impl PortConfig {
    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn with_wrap_port(mut self, wrap_port: WrapPortFn) -> Self {
        self.wrap_port = Some(wrap_port);
        self
    }

    pub fn with_event_loop(mut self, event_loop: EventLoop) -> Self {
        self.event_loop = Some(event_loop);
        self
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }
}

impl fmt::Debug for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortConfig")
            .field("autostart", &self.autostart)
            .field("wrap_port", &self.wrap_port.as_ref().map(|_| "<fn>"))
            .field("event_loop", &self.event_loop)
            .field("channel", &self.channel)
            .finish()
    }
}
