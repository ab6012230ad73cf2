use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{not_connected, DuplexStream};

/// A UDP socket bound to a local address and connected to one remote peer.
///
/// Consoles reject clients whose source address is loopback, so `local`
/// should be a routable interface address or the unspecified address.
/// Dialing from loopback is allowed (emulators and tests rely on it) but logged.
pub struct UdpStream {
    socket: Option<UdpSocket>,
    local: SocketAddr,
    remote: SocketAddr,
}

impl UdpStream {
    /// Bind `local` and connect the socket to `remote`.
    pub fn dial(local: SocketAddr, remote: SocketAddr) -> Result<Self> {
        if local.ip().is_loopback() {
            warn!(%local, "binding to a loopback address; consoles ignore loopback clients");
        }

        let dial_err = |source| TransportError::Dial {
            local,
            remote,
            source,
        };
        let socket = UdpSocket::bind(local).map_err(dial_err)?;
        socket.connect(remote).map_err(dial_err)?;
        let local = socket.local_addr().map_err(dial_err)?;

        info!(%local, %remote, "dialed udp");
        Ok(Self {
            socket: Some(socket),
            local,
            remote,
        })
    }

    /// The bound local address (with the ephemeral port resolved).
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket.as_ref().ok_or_else(not_connected)
    }
}

impl DuplexStream for UdpStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket()?.recv(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket()?.send(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.socket.take().is_some() {
            debug!(local = %self.local, remote = %self.remote, "closed udp");
        }
        Ok(())
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket()?.set_read_timeout(timeout)
    }
}

impl std::fmt::Debug for UdpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpStream")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("closed", &self.is_closed())
            .finish()
    }
}
