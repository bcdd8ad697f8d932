use msgport_stream::Observable;
use serde_json::Value;

use crate::error::HandlerError;
use crate::message::Message;

/// Stream of response items.
pub type ResponseStream = Observable<Message, HandlerError>;

/// What a message handler answers with.
#[derive(Debug, Clone, Default)]
pub enum Response {
    /// No reply traffic.
    #[default]
    Empty,
    Single(Message),
    Sequence(Vec<Message>),
    Stream(ResponseStream),
}

impl Response {
    /// A response that fails with `message` once drained.
    pub fn error(message: impl Into<String>) -> Self {
        HandlerError::new(message).into()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }

    pub fn into_observable(self) -> ResponseStream {
        match self {
            Response::Empty => Observable::empty(),
            Response::Single(message) => Observable::of(message),
            Response::Sequence(messages) => Observable::from_values(messages),
            Response::Stream(stream) => stream,
        }
    }
}

impl From<()> for Response {
    fn from(_: ()) -> Self {
        Response::Empty
    }
}

/// `null` means "no response".
impl From<Value> for Response {
    fn from(data: Value) -> Self {
        match data {
            Value::Null => Response::Empty,
            data => Response::Single(Message::new(data)),
        }
    }
}

impl From<&str> for Response {
    fn from(data: &str) -> Self {
        Response::Single(data.into())
    }
}

impl From<String> for Response {
    fn from(data: String) -> Self {
        Response::Single(data.into())
    }
}

impl From<Message> for Response {
    fn from(message: Message) -> Self {
        Response::Single(message)
    }
}

impl<M: Into<Message>> From<Vec<M>> for Response {
    fn from(items: Vec<M>) -> Self {
        Response::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<ResponseStream> for Response {
    fn from(stream: ResponseStream) -> Self {
        Response::Stream(stream)
    }
}

impl From<Observable<Value, HandlerError>> for Response {
    fn from(stream: Observable<Value, HandlerError>) -> Self {
        Response::Stream(stream.map(|data: Value| Message::new(data)))
    }
}

impl<R: Into<Response>> From<Option<R>> for Response {
    fn from(response: Option<R>) -> Self {
        response.map_or(Response::Empty, Into::into)
    }
}

/// A failure becomes a failing stream, so it takes the same path as an
/// error raised mid-stream.
impl<R: Into<Response>> From<Result<R, HandlerError>> for Response {
    fn from(result: Result<R, HandlerError>) -> Self {
        match result {
            Ok(response) => response.into(),
            Err(error) => error.into(),
        }
    }
}

impl From<HandlerError> for Response {
    fn from(error: HandlerError) -> Self {
        Response::Stream(Observable::fail(error))
    }
}
