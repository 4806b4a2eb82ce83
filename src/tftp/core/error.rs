use std::time::Duration;

use super::packet::describe;

/// Errors produced by the codec and the transfer state machine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field cannot be put on the wire (embedded NUL, oversized payload)
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A received datagram is malformed or truncated
    #[error("decoding error: {0}")]
    Decoding(String),

    /// No reply arrived within the timeout, after all retransmissions
    #[error("timeout: no response from server after {attempts} attempt(s) of {timeout:?}")]
    Timeout { attempts: u32, timeout: Duration },

    /// The server answered with something the exchange does not allow
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The server sent an ERROR packet
    #[error("server error {code}: {reason} {message}")]
    Remote {
        code: u16,
        reason: &'static str,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `Remote` error from the fields of an ERROR packet
    pub fn remote(code: u16, message: impl Into<String>) -> Self {
        Error::Remote {
            code,
            reason: describe(code),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
