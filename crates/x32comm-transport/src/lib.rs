//! Duplex stream abstraction and UDP transport.
//!
//! Everything above this layer talks to a [`DuplexStream`]: the raw UDP
//! socket implements it, and so do decorators that wrap another stream.
//! Composition happens by wrapping one implementation inside another.

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{is_timeout, DuplexStream};
pub use udp::UdpStream;
