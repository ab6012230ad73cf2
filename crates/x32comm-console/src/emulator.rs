//! A minimal stand-in console for local testing.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};
use x32comm_osc::{decode, Arg, DecodeError, Message};
use x32comm_transport::{is_timeout, TransportError};

use crate::config::DEFAULT_RECV_BUFFER;
use crate::error::Result;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Answers fader-style messages over UDP.
///
/// A message with a float argument stores that level under its address.
/// A message with no arguments, or a bare address string, is a query and
/// gets the stored level back (0.0 if never set). Anything undecodable is
/// logged and dropped.
pub struct Emulator {
    socket: UdpSocket,
    local: SocketAddr,
    levels: Mutex<HashMap<String, f32>>,
}

impl Emulator {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let bind_err = |source| TransportError::Bind { addr, source };
        let socket = UdpSocket::bind(addr).map_err(bind_err)?;
        let local = socket.local_addr().map_err(bind_err)?;
        info!(%local, "emulator listening");
        Ok(Self {
            socket,
            local,
            levels: Mutex::new(HashMap::new()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Preset the level stored under `address`.
    pub fn with_level(self, address: impl Into<String>, level: f32) -> Self {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.into(), level);
        self
    }

    pub fn level(&self, address: &str) -> Option<f32> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .copied()
    }

    /// Handle at most one datagram. Returns `false` if none arrived in `wait`.
    pub fn serve_one(&self, wait: Duration) -> Result<bool> {
        self.socket
            .set_read_timeout(Some(wait.max(Duration::from_millis(1))))
            .map_err(TransportError::Read)?;

        let mut buf = vec![0u8; DEFAULT_RECV_BUFFER];
        let (n, from) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if is_timeout(&e) => return Ok(false),
            Err(e) => return Err(TransportError::Read(e).into()),
        };
        buf.truncate(n);

        if let Some(reply) = self.respond(Bytes::from(buf)) {
            self.socket
                .send_to(&reply, from)
                .map_err(TransportError::Write)?;
            debug!(%from, bytes = reply.len(), "emulator replied");
        }
        Ok(true)
    }

    /// Serve until `running` is cleared.
    pub fn run(&self, running: &AtomicBool) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            self.serve_one(POLL_INTERVAL)?;
        }
        info!(local = %self.local, "emulator stopped");
        Ok(())
    }

    fn respond(&self, packet: Bytes) -> Option<Bytes> {
        let address = match decode(packet.clone()) {
            Ok(msg) => match msg.args() {
                [] => msg.address().to_owned(),
                [Arg::Float(level), ..] => {
                    debug!(address = msg.address(), level, "emulator stored level");
                    self.levels
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(msg.address().to_owned(), *level);
                    return None;
                }
                _ => {
                    debug!(address = msg.address(), tags = %msg.type_tags(), "emulator ignored message");
                    return None;
                }
            },
            // Bare address strings are queries too.
            Err(DecodeError::MissingTypeTags) => bare_address(&packet),
            Err(e) => {
                warn!(error = %e, bytes = packet.len(), "emulator dropped undecodable datagram");
                return None;
            }
        };

        let level = self.level(&address).unwrap_or(0.0);
        match Message::new(address).with_arg(level).and_then(|m| m.to_bytes()) {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = %e, "emulator could not encode reply");
                None
            }
        }
    }
}

fn bare_address(packet: &[u8]) -> String {
    let end = packet.iter().position(|&b| b == 0).unwrap_or(packet.len());
    String::from_utf8_lossy(&packet[..end]).into_owned()
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}
