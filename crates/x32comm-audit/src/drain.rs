use std::fmt::Write as _;
use std::io::{self, BufRead, Read, Write};

use serde::{Deserialize, Serialize};

/// Direction of audited traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Read,
    Write,
}

/// A sink that receives a copy of audited traffic.
pub trait Drain: Send {
    /// Record the bytes moved by one read or write call.
    fn record(&mut self, kind: EventKind, data: &[u8]) -> io::Result<()>;

    /// Flush and release the sink. Later records fail with `NotConnected`.
    fn close(&mut self) -> io::Result<()>;
}

impl<D: Drain + ?Sized> Drain for Box<D> {
    fn record(&mut self, kind: EventKind, data: &[u8]) -> io::Result<()> {
        (**self).record(kind, data)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "drain is closed")
}

/// Copies traffic byte-for-byte into a writer, both directions interleaved.
pub struct RawDrain<W> {
    inner: Option<W>,
}

impl<W: Write + Send> RawDrain<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    /// Consume the drain and return the writer, unless it was closed.
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }
}

impl<W: Write + Send> Drain for RawDrain<W> {
    fn record(&mut self, _kind: EventKind, data: &[u8]) -> io::Result<()> {
        let inner = self.inner.as_mut().ok_or_else(closed)?;
        inner.write_all(data)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

/// One audited call as written by [`StructuredDrain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: EventKind,
    pub hex: String,
    pub bytes: Vec<u8>,
    /// Lossy UTF-8 rendering of `bytes`.
    pub text: String,
}

impl AuditEvent {
    pub fn new(kind: EventKind, data: &[u8]) -> Self {
        Self {
            kind,
            hex: to_hex(data),
            bytes: data.to_vec(),
            text: String::from_utf8_lossy(data).into_owned(),
        }
    }
}

fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Writes one JSON line per audited call.
///
/// Reading through a structured drain (when the inner value is readable)
/// passes the inner bytes through unchanged and records them as a read event.
pub struct StructuredDrain<W> {
    inner: Option<W>,
}

impl<W: Write + Send> StructuredDrain<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn into_inner(self) -> Option<W> {
        self.inner
    }

    fn emit(&mut self, event: &AuditEvent) -> io::Result<()> {
        let inner = self.inner.as_mut().ok_or_else(closed)?;
        serde_json::to_writer(&mut *inner, event)?;
        inner.write_all(b"\n")?;
        inner.flush()
    }
}

impl<W: Write + Send> Drain for StructuredDrain<W> {
    fn record(&mut self, kind: EventKind, data: &[u8]) -> io::Result<()> {
        self.emit(&AuditEvent::new(kind, data))
    }

    fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Read + Write + Send> Read for StructuredDrain<W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(closed)?;
        let n = inner.read(buf)?;
        self.emit(&AuditEvent::new(EventKind::Read, &buf[..n]))?;
        Ok(n)
    }
}

/// Parse a log written by a [`StructuredDrain`].
pub fn read_log(reader: impl BufRead) -> io::Result<Vec<AuditEvent>> {
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
