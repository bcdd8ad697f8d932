use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use msgport_transport::{
    ChannelConfig, Endpoint, EventLoop, MessageChannel, MessagePort, TransportError, Transferable,
    Window,
};

use crate::config::PortConfig;
use crate::error::{PortError, Result};
use crate::filter::{FilterTable, ListenerRegistry};
use crate::message::Message;
use crate::observe::MessageObservable;

/// Constructor used for filter views and reply ports.
pub type WrapPortFn = Rc<dyn Fn(Wrapped) -> Port>;

/// The target a [`Port`] wraps.
#[derive(Clone)]
pub enum Wrapped {
    /// A port-like endpoint (channel port, worker, ...).
    Endpoint(Rc<dyn Endpoint>),
    /// A window, addressed at a fixed origin.
    Window {
        window: Rc<dyn Window>,
        origin: String,
    },
    /// Another port. Filter views wrap their parent this way.
    Port(Port),
}

impl Wrapped {
    /// Pointer identity on the wrapped object.
    pub fn same_target(&self, other: &Wrapped) -> bool {
        match (self, other) {
            (Wrapped::Endpoint(a), Wrapped::Endpoint(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Wrapped::Window { window: a, .. }, Wrapped::Window { window: b, .. }) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Wrapped::Port(a), Wrapped::Port(b)) => a.same_port(b),
            _ => false,
        }
    }
}

impl From<Rc<dyn Endpoint>> for Wrapped {
    fn from(endpoint: Rc<dyn Endpoint>) -> Self {
        Wrapped::Endpoint(endpoint)
    }
}

impl From<MessagePort> for Wrapped {
    fn from(port: MessagePort) -> Self {
        Wrapped::Endpoint(Rc::new(port))
    }
}

impl From<Port> for Wrapped {
    fn from(port: Port) -> Self {
        Wrapped::Port(port)
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wrapped::Endpoint(_) => f.write_str("Endpoint(..)"),
            Wrapped::Window { origin, .. } => {
                f.debug_struct("Window").field("origin", origin).finish()
            }
            Wrapped::Port(port) => f.debug_tuple("Port").field(port).finish(),
        }
    }
}

/// A wrapped endpoint with filtering, stream exposure and reply channels.
///
/// Cloning is cheap; clones share one wrapper (same filters, same listener
/// registry, same memoized message stream).
#[derive(Clone)]
pub struct Port {
    pub(crate) inner: Rc<PortInner>,
}

pub(crate) struct PortInner {
    pub(crate) wrapped: Wrapped,
    pub(crate) filters: RefCell<FilterTable>,
    pub(crate) listeners: RefCell<ListenerRegistry>,
    pub(crate) autostart: Cell<bool>,
    pub(crate) wrap_port: WrapPortFn,
    pub(crate) event_loop: Option<EventLoop>,
    pub(crate) channel: ChannelConfig,
    pub(crate) messages: OnceCell<MessageObservable>,
}

/// Wrap a target with the default configuration.
pub fn wrap(target: impl Into<Wrapped>) -> Port {
    Port::with_config(target, PortConfig::default())
}

/// Wrap a target that may be absent.
pub fn try_wrap<T: Into<Wrapped>>(target: Option<T>) -> Result<Port> {
    match target {
        Some(target) => Ok(wrap(target)),
        None => Err(PortError::InvalidEndpoint),
    }
}

/// Default factory: plain ports that inherit the event loop and channel
/// settings of the port that created them.
fn plain_factory(event_loop: Option<EventLoop>, channel: ChannelConfig) -> WrapPortFn {
    Rc::new(move |target: Wrapped| {
        Port::with_config(
            target,
            PortConfig {
                autostart: true,
                wrap_port: None,
                event_loop: event_loop.clone(),
                channel: channel.clone(),
            },
        )
    })
}

impl Port {
    pub fn with_config(target: impl Into<Wrapped>, config: PortConfig) -> Self {
        let PortConfig {
            autostart,
            wrap_port,
            event_loop,
            channel,
        } = config;
        let wrap_port =
            wrap_port.unwrap_or_else(|| plain_factory(event_loop.clone(), channel.clone()));

        Self {
            inner: Rc::new(PortInner {
                wrapped: target.into(),
                filters: RefCell::new(FilterTable::default()),
                listeners: RefCell::new(ListenerRegistry::default()),
                autostart: Cell::new(autostart),
                wrap_port,
                event_loop,
                channel,
                messages: OnceCell::new(),
            }),
        }
    }

    /// The directly wrapped target.
    pub fn wrapped(&self) -> &Wrapped {
        &self.inner.wrapped
    }

    /// The innermost target, recursing through nested ports.
    pub fn unwrap(&self) -> Wrapped {
        match &self.inner.wrapped {
            Wrapped::Port(parent) => parent.unwrap(),
            other => other.clone(),
        }
    }

    pub fn same_port(&self, other: &Port) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn autostart(&self) -> bool {
        self.inner.autostart.get()
    }

    pub fn set_autostart(&self, autostart: bool) {
        self.inner.autostart.set(autostart);
    }

    /// Build a port with this port's factory.
    pub fn wrap_port(&self, target: impl Into<Wrapped>) -> Port {
        (self.inner.wrap_port)(target.into())
    }

    pub(crate) fn factory(&self) -> WrapPortFn {
        Rc::clone(&self.inner.wrap_port)
    }

    pub fn post_message(&self, message: impl Into<Message>) -> Result<()> {
        let Message { data, transfer } = message.into();
        self.post_parts(data, transfer)
    }

    fn post_parts(&self, data: serde_json::Value, transfer: Vec<Transferable>) -> Result<()> {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.post_message(data, transfer)?,
            Wrapped::Window { window, origin } => window.post_message(data, origin, transfer)?,
            Wrapped::Port(parent) => parent.post_parts(data, transfer)?,
        }
        Ok(())
    }

    pub fn can_start(&self) -> bool {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.supports_start(),
            Wrapped::Window { .. } => false,
            Wrapped::Port(parent) => parent.can_start(),
        }
    }

    pub fn start(&self) -> Result<()> {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.start()?,
            Wrapped::Window { .. } => return Err(TransportError::Unsupported("start").into()),
            Wrapped::Port(parent) => parent.start()?,
        }
        Ok(())
    }

    pub fn can_close(&self) -> bool {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.supports_close(),
            Wrapped::Window { .. } => false,
            Wrapped::Port(parent) => parent.can_close(),
        }
    }

    pub fn close(&self) -> Result<()> {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.close()?,
            Wrapped::Window { .. } => return Err(TransportError::Unsupported("close").into()),
            Wrapped::Port(parent) => parent.close()?,
        }
        Ok(())
    }

    /// Deliver a `messageerror` carrying `reason` to the far side.
    pub fn post_error(&self, reason: &str) -> Result<()> {
        match &self.inner.wrapped {
            Wrapped::Endpoint(endpoint) => endpoint.post_error(reason)?,
            Wrapped::Window { .. } => {
                return Err(TransportError::Unsupported("post_error").into())
            }
            Wrapped::Port(parent) => parent.post_error(reason)?,
        }
        Ok(())
    }

    /// Open a channel whose near half is wrapped with this port's factory.
    /// The far half is returned raw, ready to be transferred.
    pub(crate) fn open_channel(&self) -> (Port, MessagePort) {
        let event_loop = self
            .inner
            .event_loop
            .clone()
            .unwrap_or_else(EventLoop::current);
        let (near, far) =
            MessageChannel::with_config(&event_loop, self.inner.channel.clone()).into_ports();
        tracing::debug!(near = near.id(), far = far.id(), "reply channel opened");
        (self.wrap_port(near), far)
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("wrapped", &self.inner.wrapped)
            .field("autostart", &self.inner.autostart.get())
            .field("filters", &self.inner.filters.borrow().kinds())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEndpoint;

    #[test]
    fn unwrap_returns_the_wrapped_endpoint() {
        let endpoint = RecordingEndpoint::new();
        let target: Rc<dyn Endpoint> = endpoint.clone();
        let port = wrap(target.clone());

        assert!(port.unwrap().same_target(&Wrapped::Endpoint(target)));
    }

    #[test]
    fn unwrap_recurses_through_nested_ports() {
        let endpoint = RecordingEndpoint::new();
        let target: Rc<dyn Endpoint> = endpoint.clone();
        let inner = wrap(target.clone());
        let outer = wrap(inner.clone());

        assert!(matches!(outer.wrapped(), Wrapped::Port(p) if p.same_port(&inner)));
        assert!(outer.unwrap().same_target(&Wrapped::Endpoint(target)));
    }

    #[test]
    fn absent_endpoint_is_rejected() {
        let err = try_wrap::<MessagePort>(None).unwrap_err();
        assert!(matches!(err, PortError::InvalidEndpoint));

        let (port1, _port2) = MessageChannel::new().into_ports();
        assert!(try_wrap(Some(port1)).is_ok());
    }

    #[test]
    fn wrapping_calls_nothing_on_the_endpoint() {
        let endpoint = RecordingEndpoint::new();
        let _port = wrap(endpoint.clone() as Rc<dyn Endpoint>);
        assert!(endpoint.calls().is_empty());
    }

    #[test]
    fn capabilities_follow_the_endpoint() {
        let bare = RecordingEndpoint::without_lifecycle();
        let port = wrap(bare.clone() as Rc<dyn Endpoint>);
        assert!(!port.can_start());
        assert!(!port.can_close());
        assert!(port.start().unwrap_err().is_unsupported());
        assert!(port.close().unwrap_err().is_unsupported());

        let full = RecordingEndpoint::new();
        let nested = wrap(wrap(full.clone() as Rc<dyn Endpoint>));
        assert!(nested.can_start());
        assert!(nested.can_close());
        nested.start().expect("start should be forwarded");
        nested.close().expect("close should be forwarded");
        assert_eq!(full.calls(), vec![crate::testing::Call::Start, crate::testing::Call::Close]);
    }

    #[test]
    fn post_message_forwards_data_and_transfer() {
        let endpoint = RecordingEndpoint::new();
        let port = wrap(wrap(endpoint.clone() as Rc<dyn Endpoint>));
        let (extra, _keep) = MessageChannel::new().into_ports();

        port.post_message("hello").expect("post should succeed");
        port.post_message(Message::new(7).with_transfer(extra)).expect("post should succeed");

        assert_eq!(
            endpoint.posts(),
            vec![(serde_json::json!("hello"), 0), (serde_json::json!(7), 1)]
        );
    }

    #[test]
    fn transport_errors_surface_from_post() {
        let (port1, _port2) = MessageChannel::new().into_ports();
        let port = wrap(port1.clone());
        let err = port
            .post_message(Message::new("self").with_transfer(port1))
            .unwrap_err();
        assert!(matches!(err, PortError::Transport(TransportError::DataClone)));
    }

    #[test]
    fn default_factory_inherits_event_loop() {
        let event_loop = EventLoop::new();
        let port = Port::with_config(
            RecordingEndpoint::new() as Rc<dyn Endpoint>,
            PortConfig::default().with_event_loop(event_loop.clone()),
        );
        let (near, far) = port.open_channel();
        assert!(near.autostart());
        match near.wrapped() {
            Wrapped::Endpoint(_) => {}
            other => panic!("unexpected target {other:?}"),
        }
        // The far half lives on the configured loop.
        assert!(far.event_loop().same_loop(&event_loop));
    }

    #[test]
    fn custom_factory_builds_reply_ports() {
        let built = Rc::new(Cell::new(0));
        let counter = Rc::clone(&built);
        let factory: WrapPortFn = Rc::new(move |target: Wrapped| {
            counter.set(counter.get() + 1);
            Port::with_config(target, PortConfig::default().with_autostart(false))
        });
        let port = Port::with_config(
            RecordingEndpoint::new() as Rc<dyn Endpoint>,
            PortConfig::default().with_wrap_port(factory),
        );

        let (near, _far) = port.open_channel();
        assert_eq!(built.get(), 1);
        assert!(!near.autostart());
    }
}
