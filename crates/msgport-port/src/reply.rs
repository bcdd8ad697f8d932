//! Request/response over provisioned reply channels.
//!
//! A request travels with the far half of a fresh channel as its first
//! transferable. The responder answers on that half; when its response is
//! drained (or fails) the half is closed, which ends the exchange.

use std::cell::Cell;
use std::rc::Rc;

use msgport_stream::{Observer, Subscription};
use msgport_transport::{MessageEvent, MessagePort, Transferable};

use crate::error::{HandlerError, Result};
use crate::message::Message;
use crate::port::Port;
use crate::response::Response;

/// Lifecycle of one reply interaction.
///
/// `Idle -> AwaitingResponse -> Streaming -> Closed`, forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Inbound event observed.
    Idle,
    /// Handler running.
    AwaitingResponse,
    /// Response being drained to the reply port.
    Streaming,
    /// Response finished or failed; the reply port was closed if it could be.
    Closed,
}

impl ReplyState {
    pub fn can_advance_to(self, next: ReplyState) -> bool {
        matches!(
            (self, next),
            (ReplyState::Idle, ReplyState::AwaitingResponse)
                | (ReplyState::AwaitingResponse, ReplyState::Streaming)
                | (ReplyState::Streaming, ReplyState::Closed)
        )
    }

    pub fn is_closed(self) -> bool {
        self == ReplyState::Closed
    }
}

#[derive(Clone)]
struct ReplyTracker {
    state: Rc<Cell<ReplyState>>,
}

impl ReplyTracker {
    fn new(state: ReplyState) -> Self {
        Self {
            state: Rc::new(Cell::new(state)),
        }
    }

    fn state(&self) -> ReplyState {
        self.state.get()
    }

    fn advance(&self, next: ReplyState) -> bool {
        let current = self.state.get();
        if !current.can_advance_to(next) {
            return false;
        }
        self.state.set(next);
        tracing::trace!(from = ?current, to = ?next, "reply state");
        true
    }
}

/// Forwards response items to a port.
struct PostingObserver {
    port: Port,
    splat: bool,
    close: bool,
    tracker: ReplyTracker,
}

impl PostingObserver {
    /// Shared by completion and error. Runs once.
    fn finish(&self) {
        if !self.tracker.advance(ReplyState::Closed) {
            return;
        }
        if self.close && self.port.can_close() {
            if let Err(err) = self.port.close() {
                tracing::warn!(error = %err, "failed to close reply port");
            }
        }
    }
}

impl Observer<Message, HandlerError> for PostingObserver {
    fn next(&self, message: Message) {
        if self.tracker.state() != ReplyState::Streaming {
            return;
        }
        let result = if self.splat {
            self.port.post_message(message)
        } else if !message.transfer.is_empty() {
            tracing::warn!(
                transfer = message.transfer.len(),
                "response item carries transferables but splat is off; item dropped"
            );
            return;
        } else {
            self.port.post_message(message.data)
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to post response item");
        }
    }

    fn error(&self, error: HandlerError) {
        match self.port.post_error(error.message()) {
            Ok(()) => {}
            Err(err) if err.is_unsupported() => {
                tracing::debug!(
                error = %error,
                "endpoint cannot carry errors; response error dropped"
            );
            }
            Err(err) => tracing::warn!(error = %err, "failed to post response error"),
        }
        self.finish();
    }

    fn complete(&self) {
        self.finish();
    }
}

impl Port {
    /// Post every item of `source` through this port.
    ///
    /// With `splat`, each item's data and transferables are posted together;
    /// without it only the data is posted and items carrying transferables
    /// are dropped. An error is forwarded as a `messageerror` where the
    /// endpoint supports it. When `close` is set the port is closed exactly
    /// once, after completion or after an error.
    pub fn post_observable(
        &self,
        source: impl Into<Response>,
        splat: bool,
        close: bool,
    ) -> Subscription {
        self.drain(
            source.into(),
            splat,
            close,
            ReplyTracker::new(ReplyState::Streaming),
        )
    }

    fn drain(
        &self,
        response: Response,
        splat: bool,
        close: bool,
        tracker: ReplyTracker,
    ) -> Subscription {
        response.into_observable().subscribe(PostingObserver {
            port: self.clone(),
            splat,
            close,
            tracker,
        })
    }

    /// Post `message` with a fresh reply channel and return the port the
    /// replies arrive on.
    pub fn post_message_with_reply(&self, message: impl Into<Message>) -> Result<Port> {
        let (reply, far) = self.open_channel();
        self.post_with_port(message.into(), far)?;
        Ok(reply)
    }

    /// Like [`post_message_with_reply`](Self::post_message_with_reply), but
    /// hands the reply port to `on_reply` before the message is posted.
    pub fn post_message_with_reply_to(
        &self,
        message: impl Into<Message>,
        on_reply: impl FnOnce(&Port),
    ) -> Result<()> {
        let (reply, far) = self.open_channel();
        on_reply(&reply);
        self.post_with_port(message.into(), far)
    }

    /// Post `message` with a fresh channel, then stream `source` down it.
    /// The channel is closed once `source` finishes.
    pub fn post_message_with_observable(
        &self,
        message: impl Into<Message>,
        source: impl Into<Response>,
        splat: bool,
    ) -> Result<Subscription> {
        let (near, far) = self.open_channel();
        self.post_with_port(message.into(), far)?;
        Ok(near.post_observable(source, splat, true))
    }

    fn post_with_port(&self, mut message: Message, far: MessagePort) -> Result<()> {
        message.transfer.insert(0, Transferable::Port(far));
        self.post_message(message)
    }

    /// Subscribe to messages, handing each one to `listener` along with its
    /// wrapped reply port (the event's first transferred port), if any.
    pub fn subscribe_with_port<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&MessageEvent, Option<Port>) + 'static,
    {
        let factory = self.factory();
        self.subscribe_next(move |event: MessageEvent| {
            let reply = event.reply_port().cloned().map(|port| factory(port.into()));
            listener(&event, reply);
        })
    }

    /// Answer every message with whatever `handler` returns.
    ///
    /// A non-empty response to a message that carried a reply port is
    /// drained to that port, which is closed afterwards. Anything else sends
    /// no reply traffic.
    pub fn subscribe_and_post_replies<F, R>(&self, handler: F, splat: bool) -> Subscription
    where
        F: Fn(&MessageEvent) -> R + 'static,
        R: Into<Response>,
    {
        self.subscribe_with_port(move |event, reply| {
            let tracker = ReplyTracker::new(ReplyState::Idle);
            tracker.advance(ReplyState::AwaitingResponse);

            let response: Response = handler(event).into();
            if response.is_empty() {
                tracing::trace!("handler produced no response");
                return;
            }
            let Some(reply) = reply else {
                tracing::debug!("response to a message without a reply port dropped");
                return;
            };

            tracker.advance(ReplyState::Streaming);
            reply.drain(response, splat, true, tracker);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use bytes::Bytes;
    use msgport_stream::{Observable, SubscriptionObserver, Teardown};
    use msgport_transport::{Endpoint, EventLoop, MessageChannel};
    use serde_json::{json, Value};

    use super::*;
    use crate::config::PortConfig;
    use crate::port::{wrap, WrapPortFn, Wrapped};
    use crate::testing::{Call, RecordingEndpoint};

    fn recording_port() -> (Rc<RecordingEndpoint>, Port) {
        let endpoint = RecordingEndpoint::new();
        let port = wrap(endpoint.clone() as Rc<dyn Endpoint>);
        (endpoint, port)
    }

    #[test]
    fn state_machine_only_moves_forward() {
        use ReplyState::*;
        assert!(Idle.can_advance_to(AwaitingResponse));
        assert!(AwaitingResponse.can_advance_to(Streaming));
        assert!(Streaming.can_advance_to(Closed));
        assert!(!Closed.can_advance_to(Idle));
        assert!(!Closed.can_advance_to(Closed));
        assert!(!Idle.can_advance_to(Streaming));
        assert!(Closed.is_closed());
    }

    #[test]
    fn splat_posts_data_with_transfer_then_closes() {
        let (endpoint, port) = recording_port();
        let item = Message::new(1).with_transfer(Bytes::from_static(b"2"));

        port.post_observable(Observable::<Message, HandlerError>::of(item), true, true);

        assert_eq!(
            endpoint.traffic(),
            vec![Call::Post(json!(1), 1), Call::Close]
        );
    }

    #[test]
    fn without_splat_items_with_transfer_are_dropped() {
        let (endpoint, port) = recording_port();
        let items = vec![
            Message::new("plain"),
            Message::new("heavy").with_transfer(Bytes::from_static(b"x")),
        ];

        port.post_observable(items, false, false);

        assert_eq!(endpoint.traffic(), vec![Call::Post(json!("plain"), 0)]);
    }

    #[test]
    fn close_only_when_requested_and_supported() {
        let (endpoint, port) = recording_port();
        port.post_observable(vec!["a"], false, false);
        assert!(!endpoint.traffic().contains(&Call::Close));

        let bare = RecordingEndpoint::without_lifecycle();
        let port = wrap(bare.clone() as Rc<dyn Endpoint>);
        port.post_observable(vec!["a"], false, true);
        assert_eq!(bare.traffic(), vec![Call::Post(json!("a"), 0)]);
    }

    #[test]
    fn error_is_forwarded_then_closes_once() {
        let (endpoint, port) = recording_port();
        let slot: Rc<RefCell<Option<SubscriptionObserver<Message, HandlerError>>>> =
            Rc::new(RefCell::new(None));
        let captured = Rc::clone(&slot);
        let source = Observable::new(move |observer: SubscriptionObserver<Message, HandlerError>| {
            observer.next(Message::new("partial"));
            *captured.borrow_mut() = Some(observer);
            Teardown::noop()
        });

        let subscription = port.post_observable(source, false, true);
        let emitter = slot.borrow_mut().take().expect("subscriber should run");
        emitter.error(HandlerError::new("disk full"));
        emitter.complete();
        emitter.next(Message::new("late"));

        assert_eq!(
            endpoint.traffic(),
            vec![
                Call::Post(json!("partial"), 0),
                Call::PostError("disk full".to_string()),
                Call::Close,
            ]
        );
        assert!(subscription.is_closed());
    }

    #[test]
    fn unsubscribing_stops_posting_without_closing() {
        let (endpoint, port) = recording_port();
        let slot: Rc<RefCell<Option<SubscriptionObserver<Message, HandlerError>>>> =
            Rc::new(RefCell::new(None));
        let captured = Rc::clone(&slot);
        let source = Observable::new(move |observer: SubscriptionObserver<Message, HandlerError>| {
            *captured.borrow_mut() = Some(observer);
            Teardown::noop()
        });

        let subscription = port.post_observable(source, false, true);
        let emitter = slot.borrow_mut().take().expect("subscriber should run");
        emitter.next(Message::new(1));
        subscription.unsubscribe();
        emitter.next(Message::new(2));

        assert_eq!(endpoint.traffic(), vec![Call::Post(json!(1), 0)]);
    }

    #[test]
    fn reply_port_travels_first_in_transfer() {
        let (endpoint, port) = recording_port();
        let (extra, _keep) = MessageChannel::new().into_ports();

        let reply = port
            .post_message_with_reply(Message::new("req").with_transfer(extra))
            .expect("post should succeed");

        assert_eq!(endpoint.posts(), vec![(json!("req"), 2)]);
        assert!(reply.autostart());
    }

    #[test]
    fn reply_callback_runs_before_post() {
        let (endpoint, port) = recording_port();
        let seen_posts = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen_posts);
        let recorded = Rc::clone(&endpoint);

        port.post_message_with_reply_to("req", move |_reply| {
            *sink.borrow_mut() = Some(recorded.posts().len());
        })
        .expect("post should succeed");

        assert_eq!(*seen_posts.borrow(), Some(0));
        assert_eq!(endpoint.posts().len(), 1);
    }

    /// A factory that hands every reply port to `target` instead.
    fn redirect_to(target: Rc<RecordingEndpoint>) -> WrapPortFn {
        Rc::new(move |_: Wrapped| wrap(Rc::clone(&target) as Rc<dyn Endpoint>))
    }

    #[test]
    fn handler_reply_is_posted_then_reply_port_closed() {
        let (endpoint, _) = recording_port();
        let reply_endpoint = RecordingEndpoint::new();
        let port = Port::with_config(
            endpoint.clone() as Rc<dyn Endpoint>,
            PortConfig::default().with_wrap_port(redirect_to(reply_endpoint.clone())),
        );
        let (reply_port, _far) = MessageChannel::new().into_ports();

        let _sub = port.subscribe_and_post_replies(
            |event| {
                if event.data == "inc" {
                    Some(vec!["inc 2"])
                } else {
                    None
                }
            },
            false,
        );
        endpoint.emit(MessageEvent::new("inc").with_ports(vec![reply_port]));

        assert_eq!(
            reply_endpoint.traffic(),
            vec![Call::Post(json!("inc 2"), 0), Call::Close]
        );
    }

    #[test]
    fn no_reply_traffic_for_empty_response_or_missing_port() {
        let (endpoint, _) = recording_port();
        let reply_endpoint = RecordingEndpoint::new();
        let port = Port::with_config(
            endpoint.clone() as Rc<dyn Endpoint>,
            PortConfig::default().with_wrap_port(redirect_to(reply_endpoint.clone())),
        );
        let (reply_port, _far) = MessageChannel::new().into_ports();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        let _sub = port.subscribe_and_post_replies(
            move |event| {
                counter.set(counter.get() + 1);
                if event.data == "ask" {
                    json!("answer")
                } else {
                    Value::Null
                }
            },
            false,
        );
        endpoint.emit(MessageEvent::new("ignored").with_ports(vec![reply_port]));
        endpoint.emit(MessageEvent::new("ask"));

        assert_eq!(calls.get(), 2);
        assert!(reply_endpoint.traffic().is_empty());
    }

    #[test]
    fn handler_failure_arrives_as_message_error() {
        let (endpoint, _) = recording_port();
        let reply_endpoint = RecordingEndpoint::new();
        let port = Port::with_config(
            endpoint.clone() as Rc<dyn Endpoint>,
            PortConfig::default().with_wrap_port(redirect_to(reply_endpoint.clone())),
        );
        let (reply_port, _far) = MessageChannel::new().into_ports();

        let _sub = port.subscribe_and_post_replies(
            |_| -> std::result::Result<Vec<String>, HandlerError> {
                Err(HandlerError::new("unknown command"))
            },
            false,
        );
        endpoint.emit(MessageEvent::new("frobnicate").with_ports(vec![reply_port]));

        assert_eq!(
            reply_endpoint.traffic(),
            vec![Call::PostError("unknown command".to_string()), Call::Close]
        );
    }

    #[test]
    fn subscribe_with_port_wraps_first_port() {
        let (endpoint, port) = recording_port();
        let (reply_port, _far) = MessageChannel::new().into_ports();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let _sub = port.subscribe_with_port(move |event, reply| {
            sink.borrow_mut().push((event.data.clone(), reply.is_some()));
        });
        endpoint.emit(MessageEvent::new("with").with_ports(vec![reply_port]));
        endpoint.emit(MessageEvent::new("without"));

        assert_eq!(
            *seen.borrow(),
            vec![(json!("with"), true), (json!("without"), false)]
        );
    }

    #[test]
    fn observable_upload_over_real_channel() {
        let event_loop = EventLoop::new();
        let (client_end, server_end) = MessageChannel::with_event_loop(&event_loop).into_ports();
        let client = Port::with_config(
            client_end,
            PortConfig::default().with_event_loop(event_loop.clone()),
        );
        let server = wrap(server_end);
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);

        let _server_sub = server.subscribe_with_port(move |event, upload| {
            let Some(upload) = upload else { return };
            let header = event.data.clone();
            let sink = Rc::clone(&sink);
            upload.subscribe_next(move |item| {
                sink.borrow_mut().push((header.clone(), item.data));
            });
        });
        let upload = client
            .post_message_with_observable("upload", vec![json!(1), json!(2)], false)
            .expect("upload should post");
        event_loop.run_until_idle();

        assert!(upload.is_closed());
        assert_eq!(
            *received.borrow(),
            vec![(json!("upload"), json!(1)), (json!("upload"), json!(2))]
        );
    }
}
