use std::fmt;

use msgport_port::PortError;
use msgport_transport::TransportError;

// Exit code constants, sysexits-style where one applies.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::DataClone => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        TransportError::InboxFull { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TransportError::Unsupported(_) | TransportError::UnknownEventType(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

pub fn port_error(context: &str, err: PortError) -> CliError {
    match err {
        PortError::Transport(err) => transport_error(context, err),
        PortError::InvalidEndpoint | PortError::MissingWindow | PortError::MissingOrigin => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

/// Fails unless exactly `expected` replies arrived.
pub fn expect_replies(context: &str, expected: usize, received: usize) -> CliResult<()> {
    if expected == received {
        return Ok(());
    }
    Err(CliError::new(
        FAILURE,
        format!("{context}: expected {expected} replies, received {received}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_to_exit_codes() {
        assert_eq!(
            transport_error("post", TransportError::DataClone).code,
            DATA_INVALID
        );
        assert_eq!(
            transport_error("post", TransportError::InboxFull { capacity: 1 }).code,
            TRANSPORT_ERROR
        );
        assert_eq!(
            transport_error("start", TransportError::Unsupported("start")).code,
            USAGE
        );
    }

    #[test]
    fn port_errors_keep_context() {
        let err = port_error("wrap", PortError::InvalidEndpoint);
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("wrap: "));

        let err = port_error("wrap window", PortError::MissingOrigin);
        assert_eq!(err.code, USAGE);
        assert_eq!(err.message, "wrap window: no origin given");

        let err = port_error("post", PortError::Transport(TransportError::DataClone));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn reply_count_mismatch_fails() {
        assert!(expect_replies("ping", 2, 2).is_ok());
        let err = expect_replies("ping", 2, 1).unwrap_err();
        assert_eq!(err.code, FAILURE);
    }
}
