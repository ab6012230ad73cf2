//! Traffic auditing for duplex streams.
//!
//! [`AuditedConnection`] wraps a primary [`DuplexStream`] and copies every
//! byte read or written into a [`Drain`]. Drains either dump raw bytes
//! ([`RawDrain`]) or record one JSON event per call ([`StructuredDrain`]).
//!
//! [`DuplexStream`]: x32comm_transport::DuplexStream

pub mod connection;
pub mod drain;
pub mod error;
pub mod session;

pub use connection::{AuditedConnection, AuditedConnectionBuilder};
pub use drain::{read_log, AuditEvent, Drain, EventKind, RawDrain, StructuredDrain};
pub use error::{CloseError, CloseStage, ConfigurationError, Result};
pub use session::{open_session_drain, session_drain_path, DrainFormat};
