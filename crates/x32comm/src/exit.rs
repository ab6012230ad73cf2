use std::fmt;

use x32comm_console::{ConsoleError, FadeError};
use x32comm_transport::TransportError;

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const CONFIG: i32 = 78;
pub const CANCELLED: i32 = 130;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

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

pub fn console_error(context: &str, err: ConsoleError) -> CliError {
    let code = console_error_code(&err);
    CliError::new(code, format!("{context}: {err}"))
}

fn console_error_code(err: &ConsoleError) -> i32 {
    match err {
        ConsoleError::Transport(TransportError::Timeout(_)) => TIMEOUT,
        ConsoleError::Transport(_) | ConsoleError::Close(_) => TRANSPORT_ERROR,
        ConsoleError::Configuration(_) => CONFIG,
        ConsoleError::Encode(_) => USAGE,
        ConsoleError::Decode(_)
        | ConsoleError::TypeMismatch(_)
        | ConsoleError::MissingArgument { .. } => DATA_INVALID,
        ConsoleError::Fade(FadeError::Send { source, .. }) => console_error_code(source),
    }
}
