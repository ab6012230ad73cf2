use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};
use x32comm_audit::{open_session_drain, AuditedConnection, CloseError};
use x32comm_osc::{fader_path, Arg, Message};
use x32comm_transport::{is_timeout, DuplexStream, TransportError, UdpStream};

use crate::config::{ConsoleConfig, PLACEHOLDER};
use crate::error::{ConsoleError, Result};
use crate::fade::{CancelToken, FadeOutcome, FadeScheduler, LevelSink};

// std rejects a zero read timeout.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// A client session with one console.
///
/// Owns a single connected socket, optionally wrapped in an
/// [`AuditedConnection`]. Receives on one console race for the same
/// inbound datagram, so callers should not receive concurrently.
pub struct Console {
    config: ConsoleConfig,
    stream: Box<dyn DuplexStream>,
    audit_path: Option<PathBuf>,
}

impl Console {
    /// Open the socket and, when auditing is configured, the session drain.
    pub fn dial(config: ConsoleConfig) -> Result<Self> {
        let socket = UdpStream::dial(config.local, config.remote)?;

        let (stream, audit_path): (Box<dyn DuplexStream>, _) = match &config.audit {
            Some(audit) => {
                let (path, drain) = open_session_drain(&audit.dir, audit.format)?;
                let conn = AuditedConnection::builder()
                    .with_primary(socket)
                    .with_drain(drain)
                    .build()?;
                (Box::new(conn), Some(path))
            }
            None => (Box::new(socket), None),
        };

        info!(remote = %config.remote, audited = audit_path.is_some(), "console dialed");
        Ok(Self {
            config,
            stream,
            audit_path,
        })
    }

    /// Run a console session over an already established stream.
    pub fn with_stream(config: ConsoleConfig, stream: impl DuplexStream + 'static) -> Self {
        Self {
            config,
            stream: Box::new(stream),
            audit_path: None,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// The drain file for this session, if it is audited.
    pub fn audit_path(&self) -> Option<&Path> {
        self.audit_path.as_deref()
    }

    /// Write `s` verbatim, with every `~` turned into a zero byte.
    pub fn send_string(&self, s: &str) -> Result<()> {
        let bytes: Vec<u8> = s
            .chars()
            .map(|c| if c == PLACEHOLDER { '\0' } else { c })
            .collect::<String>()
            .into_bytes();
        match self.stream.write(&bytes) {
            Ok(n) => {
                debug!(bytes = n, "sent string");
                Ok(())
            }
            // Send-only callers have nothing to lose at end of stream.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(write_error(e).into()),
        }
    }

    /// Encode `message` (unless already encoded) and send it.
    pub fn send(&self, message: &mut Message) -> Result<()> {
        let raw = message.encode()?;
        let n = self.stream.write(&raw).map_err(write_error)?;
        debug!(address = message.address(), bytes = n, "sent message");
        Ok(())
    }

    /// Wait up to `wait` for one datagram and return it undecoded.
    pub fn receive(&self, wait: Duration) -> Result<Message> {
        self.stream
            .set_read_timeout(Some(wait.max(MIN_WAIT)))
            .map_err(read_error)?;

        // One spare byte tells a full datagram from a truncated one.
        let limit = self.config.recv_buffer_size;
        let mut buf = vec![0u8; limit + 1];
        let n = match self.stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) => return Err(TransportError::Timeout(wait).into()),
            Err(e) => return Err(read_error(e).into()),
        };
        if n > limit {
            return Err(TransportError::Read(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("datagram exceeds the {limit}-byte receive buffer"),
            ))
            .into());
        }
        buf.truncate(n);
        debug!(bytes = n, "received datagram");
        Ok(Message::from_raw(Bytes::from(buf)))
    }

    /// Receive one datagram and decode it.
    pub fn listen(&self, wait: Duration) -> Result<Message> {
        let raw = self.receive(wait)?;
        Ok(raw.parse()?)
    }

    /// Send `address` as a bare string and decode the reply.
    pub fn query(&self, address: &str, wait: Duration) -> Result<Message> {
        self.send_string(address)?;
        self.listen(wait)
    }

    /// Send a message to `address` carrying a single argument.
    pub fn compose(&self, address: &str, arg: impl Into<Arg>) -> Result<()> {
        let mut message = Message::new(address).with_arg(arg)?;
        self.send(&mut message)
    }

    pub fn set_fader(&self, channel: u32, level: f32) -> Result<()> {
        self.compose(&fader_path(channel), level)
    }

    /// Ask the console for a fader level.
    pub fn get_fader(&self, channel: u32, wait: Duration) -> Result<f32> {
        let reply = self.query(&fader_path(channel), wait)?;
        let arg = reply.arg(0).ok_or_else(|| ConsoleError::MissingArgument {
            address: reply.address().to_owned(),
        })?;
        Ok(arg.as_f32()?)
    }

    /// Ramp a fader from `start` to `stop` over roughly `duration`.
    pub fn fade(
        &self,
        channel: u32,
        start: f32,
        stop: f32,
        duration: Duration,
        cancel: &CancelToken,
    ) -> Result<FadeOutcome> {
        let outcome =
            FadeScheduler::new().make_fade(self, channel, start, stop, duration, cancel)?;
        Ok(outcome)
    }

    /// Ramp a fader from its current level to `stop`.
    pub fn fade_to(
        &self,
        channel: u32,
        stop: f32,
        duration: Duration,
        wait: Duration,
        cancel: &CancelToken,
    ) -> Result<FadeOutcome> {
        let start = self.get_fader(channel, wait)?;
        info!(channel, start, stop, "fading from current level");
        self.fade(channel, start, stop, duration, cancel)
    }

    /// Close the connection. Drain and socket failures are both reported.
    pub fn close(&mut self) -> Result<()> {
        match self.stream.close() {
            Ok(()) => {
                debug!(remote = %self.config.remote, "console closed");
                Ok(())
            }
            Err(e) => match e.downcast::<CloseError>() {
                Ok(close) => Err(close.into()),
                Err(e) => Err(TransportError::Shutdown(e).into()),
            },
        }
    }
}

impl LevelSink for Console {
    fn send_level(&self, channel: u32, level: f32) -> Result<()> {
        self.set_fader(channel, level)
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("local", &self.config.local)
            .field("remote", &self.config.remote)
            .field("audit_path", &self.audit_path)
            .finish()
    }
}

fn write_error(e: io::Error) -> TransportError {
    if e.kind() == io::ErrorKind::NotConnected {
        TransportError::Closed
    } else {
        TransportError::Write(e)
    }
}

fn read_error(e: io::Error) -> TransportError {
    if e.kind() == io::ErrorKind::NotConnected {
        TransportError::Closed
    } else {
        TransportError::Read(e)
    }
}
