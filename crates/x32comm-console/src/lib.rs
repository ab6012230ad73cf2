//! Console client for X32-family mixers.
//!
//! This is the layer applications use. Dial a console once, then send
//! messages, wait for replies, or ramp a fader over time.

pub mod config;
pub mod console;
pub mod emulator;
pub mod error;
pub mod fade;

pub use config::{AuditConfig, ConsoleConfig, CONSOLE_PORT, DEFAULT_LOCAL_PORT, DEFAULT_WAIT};
pub use console::Console;
pub use emulator::Emulator;
pub use error::{ConsoleError, FadeError, Result};
pub use fade::{CancelToken, FadeOutcome, FadePlan, FadeScheduler, LevelSink, RESOLUTION};
