use std::fmt;

use thiserror::Error as ThisError;

/// An error reply sent by the server as a `-` frame.
///
/// The first word of the payload is a conventional error kind tag (`ERR`,
/// `WRONGTYPE`, ...). Replies without a space carry an empty kind and the
/// whole payload as the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReply {
    pub kind: String,
    pub message: String,
}

impl fmt::Display for ErrorReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} {}", self.kind, self.message)
        }
    }
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid configuration; {0}")]
    Config(String),

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("connection pool is full")]
    PoolFull,

    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("io error; {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream deviated from the RESP framing rules.
    #[error("protocol error; {0}")]
    Protocol(String),

    /// The peer closed the connection at a frame boundary.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A well-formed error reply. The connection kept its framing contract.
    #[error("server error; {0}")]
    Server(ErrorReply),

    #[error("operation cancelled")]
    Cancelled,

    /// The reply was valid RESP but not the shape the command expects.
    #[error("unexpected response")]
    UnexpectedResponse,
}

impl Error {
    /// Whether this failure leaves the connection's stream at an unknown
    /// offset relative to the server. Server error replies are the one kind
    /// that keeps the stream usable.
    pub(crate) fn poisons_connection(&self) -> bool {
        !matches!(self, Error::Server(_))
    }
}
