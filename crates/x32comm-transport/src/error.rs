use std::net::SocketAddr;
use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local address or connect to the remote one.
    #[error("failed to dial {remote} from {local}: {source}")]
    Dial {
        local: SocketAddr,
        remote: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to bind a listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Writing to the stream failed.
    #[error("write failed: {0}")]
    Write(std::io::Error),

    /// Reading from the stream failed.
    #[error("read failed: {0}")]
    Read(std::io::Error),

    /// Closing the stream failed.
    #[error("close failed: {0}")]
    Shutdown(std::io::Error),

    /// No datagram arrived within the allotted wait.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The stream has been closed.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
