use x32comm_audit::{CloseError, ConfigurationError};
use x32comm_osc::{DecodeError, EncodeError, TypeMismatchError};
use x32comm_transport::TransportError;

/// Errors that can occur in console operations.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Socket-level failure, including receive timeouts.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A required collaborator was missing or could not be created.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The outgoing message could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The reply could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The reply carried a different argument type than expected.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),

    /// The reply carried no argument where one was expected.
    #[error("reply from {address} has no arguments")]
    MissingArgument { address: String },

    /// Teardown failed in one or more stages.
    #[error(transparent)]
    Close(#[from] CloseError),

    /// A fade did not complete.
    #[error(transparent)]
    Fade(#[from] FadeError),
}

/// Errors that stop a fade before it converges.
#[derive(Debug, thiserror::Error)]
pub enum FadeError {
    /// Sending the level for one step failed; later steps were not sent.
    #[error("fade step {step} (level {level}) failed: {source}")]
    Send {
        step: usize,
        level: f32,
        source: Box<ConsoleError>,
    },
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    /// Whether this error is an expired receive wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConsoleError::Transport(TransportError::Timeout(_)))
    }
}
