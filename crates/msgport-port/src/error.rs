/// Errors that can occur in port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] msgport_transport::TransportError),

    /// No endpoint was given to wrap.
    #[error("no endpoint given")]
    InvalidEndpoint,

    /// A window wrapper was configured without a window.
    #[error("no window given")]
    MissingWindow,

    /// A window wrapper was configured without an origin.
    #[error("no origin given")]
    MissingOrigin,
}

impl PortError {
    /// True when the wrapped endpoint lacks the requested capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            PortError::Transport(msgport_transport::TransportError::Unsupported(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, PortError>;

/// Failure raised by a message handler or a response stream.
///
/// Travels on observable error channels; over a reply channel it arrives
/// at the requester as a `messageerror` event carrying [`message`](Self::message).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
