/// Errors that can occur in endpoint and channel operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint does not provide the named capability.
    #[error("endpoint does not support `{0}`")]
    Unsupported(&'static str),

    /// A port was listed as a transferable on its own channel.
    #[error("port cannot be transferred through its own channel")]
    DataClone,

    /// The receiving port has too many undelivered messages.
    #[error("inbox full ({capacity} messages pending)")]
    InboxFull { capacity: usize },

    /// An event type name was not recognised.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
