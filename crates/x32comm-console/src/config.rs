use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use x32comm_audit::DrainFormat;

/// Port consoles listen on for OSC.
pub const CONSOLE_PORT: u16 = 10023;

/// Local port clients bind by default.
pub const DEFAULT_LOCAL_PORT: u16 = 10024;

/// Default wait for a reply.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(9);

/// Largest datagram accepted by a receive.
pub const DEFAULT_RECV_BUFFER: usize = 8 * 1024;

/// Character that [`crate::Console::send_string`] turns into a zero byte.
pub const PLACEHOLDER: char = '~';

/// Where and how to audit session traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Directory that receives one drain file per session.
    pub dir: PathBuf,
    pub format: DrainFormat,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            format: DrainFormat::Structured,
        }
    }
}

/// Everything needed to dial a console.
///
/// Built once by the caller and passed to [`crate::Console::dial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Local bind address. Must not be loopback when talking to real hardware.
    pub local: SocketAddr,
    /// Console address.
    pub remote: SocketAddr,
    /// Traffic auditing; `None` talks to the socket directly.
    pub audit: Option<AuditConfig>,
    pub recv_buffer_size: usize,
}

impl ConsoleConfig {
    /// Defaults for talking to `remote`: bind all interfaces on
    /// [`DEFAULT_LOCAL_PORT`] and audit into the temp directory.
    pub fn new(remote: SocketAddr) -> Self {
        Self {
            local: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LOCAL_PORT)),
            remote,
            audit: Some(AuditConfig::default()),
            recv_buffer_size: DEFAULT_RECV_BUFFER,
        }
    }

    pub fn with_local(mut self, local: SocketAddr) -> Self {
        self.local = local;
        self
    }

    pub fn with_audit(mut self, audit: Option<AuditConfig>) -> Self {
        self.audit = audit;
        self
    }
}
