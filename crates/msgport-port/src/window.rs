use std::fmt;
use std::rc::Rc;

use msgport_transport::{EventType, MessageEvent, Window};

use crate::config::PortConfig;
use crate::error::{PortError, Result};
use crate::port::{Port, WrapPortFn, Wrapped};

/// Accept events from any origin.
pub const ANY_ORIGIN: &str = "*";

/// Options for [`wrap_window`].
#[derive(Clone, Default)]
pub struct WindowOptions {
    pub window: Option<Rc<dyn Window>>,
    /// Origin posts are addressed to and events must come from.
    pub origin: Option<String>,
    /// Constructor for filter views and reply ports. Defaults to plain
    /// ports, so replies in a window conversation are ordinary channel
    /// ports.
    pub wrap_port: Option<WrapPortFn>,
}

impl WindowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(mut self, window: Rc<dyn Window>) -> Self {
        self.window = Some(window);
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn wrap_port(mut self, wrap_port: WrapPortFn) -> Self {
        self.wrap_port = Some(wrap_port);
        self
    }
}

impl fmt::Debug for WindowOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowOptions")
            .field("window", &self.window.as_ref().map(|_| "<window>"))
            .field("origin", &self.origin)
            .field("wrap_port", &self.wrap_port.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Wrap a window so it behaves like a port talking to one origin.
///
/// Posts are addressed to `origin`. Unless the origin is `"*"`, events from
/// any other origin never reach this port's listeners.
pub fn wrap_window(options: WindowOptions) -> Result<Port> {
    let WindowOptions {
        window,
        origin,
        wrap_port,
    } = options;
    let window = window.ok_or(PortError::MissingWindow)?;
    let origin = origin
        .filter(|origin| !origin.is_empty())
        .ok_or(PortError::MissingOrigin)?;

    let port = Port::with_config(
        Wrapped::Window {
            window,
            origin: origin.clone(),
        },
        PortConfig {
            wrap_port,
            ..PortConfig::default()
        },
    );

    if origin != ANY_ORIGIN {
        for kind in EventType::ALL {
            let expected = origin.clone();
            port.set_filter(kind, Rc::new(move |event: &MessageEvent| event.origin == expected));
        }
    }
    tracing::debug!(%origin, "window wrapped");
    Ok(port)
}
