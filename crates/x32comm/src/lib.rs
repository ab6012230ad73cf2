//! Control X32-family mixing consoles over OSC/UDP.
//!
//! # Crate Structure
//!
//! - [`osc`]: message model and wire codec
//! - [`transport`]: duplex stream abstraction and UDP socket
//! - [`audit`]: traffic-auditing connection decorator
//! - [`console`]: console client, fades, and a local emulator

/// Re-export codec types.
pub mod osc {
    pub use x32comm_osc::*;
}

/// Re-export transport types.
pub mod transport {
    pub use x32comm_transport::*;
}

/// Re-export audit types.
pub mod audit {
    pub use x32comm_audit::*;
}

/// Re-export console types.
pub mod console {
    pub use x32comm_console::*;
}
