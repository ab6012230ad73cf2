use std::io;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, warn};
use x32comm_transport::DuplexStream;

use crate::drain::{Drain, EventKind};
use crate::error::{CloseError, CloseStage, ConfigurationError, Result};

struct Parts {
    primary: Box<dyn DuplexStream>,
    // Reads share the outer lock, so the drain serializes them itself.
    drain: Mutex<Box<dyn Drain>>,
}

/// A [`DuplexStream`] decorator that copies all traffic into a [`Drain`].
///
/// Reads run concurrently with each other. Writes and closes take the
/// connection exclusively and wait for in-flight reads to finish.
pub struct AuditedConnection {
    parts: RwLock<Option<Parts>>,
}

impl AuditedConnection {
    pub fn builder() -> AuditedConnectionBuilder {
        AuditedConnectionBuilder::default()
    }

    /// Wrap `primary`, auditing into `drain`.
    pub fn new(primary: Box<dyn DuplexStream>, drain: Box<dyn Drain>) -> Self {
        Self {
            parts: RwLock::new(Some(Parts {
                primary,
                drain: Mutex::new(drain),
            })),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.parts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Close the drain, then the primary stream, and drop both.
    ///
    /// The primary is closed even when the drain fails; every failure is
    /// reported. Closing an already closed connection succeeds.
    pub fn shutdown(&self) -> std::result::Result<(), CloseError> {
        let mut guard = self.parts.write().unwrap_or_else(PoisonError::into_inner);
        let Some(Parts { mut primary, drain }) = guard.take() else {
            return Ok(());
        };

        let mut err = CloseError::new();
        let mut drain = drain.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = drain.close() {
            warn!(error = %e, "audit drain close failed");
            err.push(CloseStage::Drain, e);
        }
        if let Err(e) = primary.close() {
            warn!(error = %e, "primary close failed");
            err.push(CloseStage::Primary, e);
        }
        debug!(failures = err.len(), "audited connection closed");
        err.into_result()
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "audited connection is closed")
}

impl DuplexStream for AuditedConnection {
    /// Read from the primary and copy what arrived into the drain.
    ///
    /// If the drain rejects the copy, the read fails and `buf` is zeroed so
    /// the unaudited bytes never reach the caller.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let guard = self.parts.read().unwrap_or_else(PoisonError::into_inner);
        let parts = guard.as_ref().ok_or_else(not_connected)?;

        let n = parts.primary.read(buf)?;
        let recorded = parts
            .drain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(EventKind::Read, &buf[..n]);
        if let Err(e) = recorded {
            buf[..n].fill(0);
            return Err(e);
        }
        debug!(bytes = n, "audited read");
        Ok(n)
    }

    /// Write to the primary, then copy the written bytes into the drain.
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let guard = self.parts.write().unwrap_or_else(PoisonError::into_inner);
        let parts = guard.as_ref().ok_or_else(not_connected)?;

        let n = parts.primary.write(buf)?;
        parts
            .drain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(EventKind::Write, &buf[..n])?;
        debug!(bytes = n, "audited write");
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        self.shutdown().map_err(io::Error::other)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        let guard = self.parts.read().unwrap_or_else(PoisonError::into_inner);
        let parts = guard.as_ref().ok_or_else(not_connected)?;
        parts.primary.set_read_timeout(timeout)
    }
}

impl std::fmt::Debug for AuditedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditedConnection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builds an [`AuditedConnection`]; both collaborators are required.
#[derive(Default)]
pub struct AuditedConnectionBuilder {
    primary: Option<Box<dyn DuplexStream>>,
    drain: Option<Box<dyn Drain>>,
}

impl AuditedConnectionBuilder {
    pub fn with_primary(mut self, primary: impl DuplexStream + 'static) -> Self {
        self.primary = Some(Box::new(primary));
        self
    }

    pub fn with_drain(mut self, drain: impl Drain + 'static) -> Self {
        self.drain = Some(Box::new(drain));
        self
    }

    pub fn build(self) -> Result<AuditedConnection> {
        let primary = self.primary.ok_or(ConfigurationError::MissingPrimary)?;
        let drain = self.drain.ok_or(ConfigurationError::MissingDrain)?;
        Ok(AuditedConnection::new(primary, drain))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::drain::RawDrain;

    /// In-memory primary: reads pop queued datagrams, writes are collected.
    #[derive(Default)]
    struct MemoryStream {
        inbound: Mutex<VecDeque<Vec<u8>>>,
        outbound: Arc<Mutex<Vec<u8>>>,
        close_error: Option<io::ErrorKind>,
        closed: Arc<AtomicUsize>,
    }

    impl MemoryStream {
        fn with_inbound<D: AsRef<[u8]>>(datagrams: &[D]) -> Self {
            Self {
                inbound: Mutex::new(datagrams.iter().map(|d| d.as_ref().to_vec()).collect()),
                ..Self::default()
            }
        }
    }

    impl DuplexStream for MemoryStream {
        fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
            let datagram = self
                .inbound
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))?;
            let n = datagram.len().min(buf.len());
            buf[..n].copy_from_slice(&datagram[..n]);
            Ok(n)
        }

        fn write(&self, buf: &[u8]) -> io::Result<usize> {
            self.outbound.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            match self.close_error {
                Some(kind) => Err(io::Error::new(kind, "primary close failed")),
                None => Ok(()),
            }
        }

        fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    /// Drain that records events into shared memory and can be told to fail.
    #[derive(Default, Clone)]
    struct MemoryDrain {
        events: Arc<Mutex<Vec<(EventKind, Vec<u8>)>>>,
        fail_record: bool,
        fail_close: bool,
    }

    impl Drain for MemoryDrain {
        fn record(&mut self, kind: EventKind, data: &[u8]) -> io::Result<()> {
            if self.fail_record {
                return Err(io::Error::other("drain record failed"));
            }
            self.events.lock().unwrap().push((kind, data.to_vec()));
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            if self.fail_close {
                return Err(io::Error::other("drain close failed"));
            }
            Ok(())
        }
    }

    /// Primary whose reads block for `hold` and whose calls are logged in order.
    struct SlowStream {
        hold: Duration,
        started: Mutex<Sender<()>>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SlowStream {
        fn new(hold: Duration) -> (Self, Receiver<()>, Arc<Mutex<Vec<&'static str>>>) {
            let (tx, rx) = mpsc::channel();
            let log = Arc::new(Mutex::new(Vec::new()));
            let stream = Self {
                hold,
                started: Mutex::new(tx),
                log: Arc::clone(&log),
            };
            (stream, rx, log)
        }
    }

    impl DuplexStream for SlowStream {
        fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
            self.started.lock().unwrap().send(()).unwrap();
            std::thread::sleep(self.hold);
            self.log.lock().unwrap().push("read");
            buf[0] = b'r';
            Ok(1)
        }

        fn write(&self, buf: &[u8]) -> io::Result<usize> {
            self.log.lock().unwrap().push("write");
            Ok(buf.len())
        }

        fn close(&mut self) -> io::Result<()> {
            self.log.lock().unwrap().push("close");
            Ok(())
        }

        fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
    }

    /// Start a read on another thread and return once the primary is inside it.
    fn read_in_background(
        conn: &Arc<AuditedConnection>,
        started: &Receiver<()>,
    ) -> std::thread::JoinHandle<io::Result<usize>> {
        let handle = {
            let conn = Arc::clone(conn);
            std::thread::spawn(move || conn.read(&mut [0u8; 4]))
        };
        started.recv().unwrap();
        handle
    }

    #[test]
    fn builder_requires_primary() {
        let err = AuditedConnection::builder()
            .with_drain(MemoryDrain::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingPrimary));
    }

    #[test]
    fn builder_requires_drain() {
        let err = AuditedConnection::builder()
            .with_primary(MemoryStream::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingDrain));
    }

    #[test]
    fn write_reaches_primary_and_drain() {
        let primary = MemoryStream::default();
        let wire = Arc::clone(&primary.outbound);
        let drain = MemoryDrain::default();
        let events = Arc::clone(&drain.events);
        let conn = AuditedConnection::builder()
            .with_primary(primary)
            .with_drain(drain)
            .build()
            .unwrap();

        let payload = b"/ch/01/mix/fader\0\0\0\0,f\0\0\x3f\0\0\0";
        assert_eq!(conn.write(payload).unwrap(), payload.len());

        assert_eq!(wire.lock().unwrap().as_slice(), payload);
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[(EventKind::Write, payload.to_vec())]
        );
    }

    #[test]
    fn read_reaches_caller_and_drain() {
        let drain = MemoryDrain::default();
        let events = Arc::clone(&drain.events);
        let conn = AuditedConnection::new(
            Box::new(MemoryStream::with_inbound(&[b"reply\0\0\0"])),
            Box::new(drain),
        );

        let mut buf = [0u8; 32];
        let n = conn.read(&mut buf).unwrap();

        assert_eq!(&buf[..n], b"reply\0\0\0");
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[(EventKind::Read, b"reply\0\0\0".to_vec())]
        );
    }

    #[test]
    fn drain_failure_fails_read_and_withholds_bytes() {
        let drain = MemoryDrain {
            fail_record: true,
            ..MemoryDrain::default()
        };
        let conn = AuditedConnection::new(
            Box::new(MemoryStream::with_inbound(&[b"secret"])),
            Box::new(drain),
        );

        let mut buf = [0u8; 8];
        let err = conn.read(&mut buf).unwrap_err();
        assert_eq!(err.to_string(), "drain record failed");
        assert_eq!(buf, [0u8; 8]);
    }

    #[test]
    fn drain_failure_fails_write() {
        let drain = MemoryDrain {
            fail_record: true,
            ..MemoryDrain::default()
        };
        let conn = AuditedConnection::new(Box::new(MemoryStream::default()), Box::new(drain));

        assert!(conn.write(b"x").is_err());
    }

    #[test]
    fn primary_read_error_skips_drain() {
        let drain = MemoryDrain::default();
        let events = Arc::clone(&drain.events);
        let conn = AuditedConnection::new(Box::new(MemoryStream::default()), Box::new(drain));

        let mut buf = [0u8; 4];
        let err = conn.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn close_aggregates_drain_and_primary_failures() {
        let primary = MemoryStream {
            close_error: Some(io::ErrorKind::BrokenPipe),
            ..MemoryStream::default()
        };
        let closed = Arc::clone(&primary.closed);
        let drain = MemoryDrain {
            fail_close: true,
            ..MemoryDrain::default()
        };
        let conn = AuditedConnection::new(Box::new(primary), Box::new(drain));

        let err = conn.shutdown().unwrap_err();

        assert_eq!(err.len(), 2);
        assert_eq!(err.failures()[0].0, CloseStage::Drain);
        assert_eq!(err.failures()[1].0, CloseStage::Primary);
        assert_eq!(
            err.stage(CloseStage::Drain).unwrap().to_string(),
            "drain close failed"
        );
        assert_eq!(
            err.stage(CloseStage::Primary).unwrap().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drain_close_failure_still_closes_primary() {
        let primary = MemoryStream::default();
        let closed = Arc::clone(&primary.closed);
        let drain = MemoryDrain {
            fail_close: true,
            ..MemoryDrain::default()
        };
        let conn = AuditedConnection::new(Box::new(primary), Box::new(drain));

        let err = conn.shutdown().unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.stage(CloseStage::Primary).is_none());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_connection_rejects_io_and_closes_once() {
        let primary = MemoryStream::default();
        let closed = Arc::clone(&primary.closed);
        let mut conn =
            AuditedConnection::new(Box::new(primary), Box::new(RawDrain::new(Vec::new())));

        DuplexStream::close(&mut conn).unwrap();
        conn.shutdown().unwrap();

        assert!(conn.is_closed());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            conn.write(b"x").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        let mut buf = [0u8; 1];
        assert_eq!(
            conn.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }

    #[test]
    fn trait_close_carries_close_error() {
        let drain = MemoryDrain {
            fail_close: true,
            ..MemoryDrain::default()
        };
        let mut conn =
            AuditedConnection::new(Box::new(MemoryStream::default()), Box::new(drain));

        let err = DuplexStream::close(&mut conn).unwrap_err();
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<CloseError>())
            .expect("close error should be preserved");
        assert!(inner.stage(CloseStage::Drain).is_some());
    }

    #[test]
    fn concurrent_reads_are_all_audited() {
        const READERS: usize = 8;
        let datagrams: Vec<Vec<u8>> = (0..READERS)
            .map(|i| format!("msg-{i}").into_bytes())
            .collect();
        let drain = MemoryDrain::default();
        let events = Arc::clone(&drain.events);
        let conn = Arc::new(AuditedConnection::new(
            Box::new(MemoryStream::with_inbound(&datagrams)),
            Box::new(drain),
        ));
        let barrier = Arc::new(Barrier::new(READERS));

        let handles: Vec<_> = (0..READERS)
            .map(|_| {
                let conn = Arc::clone(&conn);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let mut buf = [0u8; 16];
                    let n = conn.read(&mut buf).unwrap();
                    buf[..n].to_vec()
                })
            })
            .collect();

        let mut delivered: Vec<Vec<u8>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let mut audited: Vec<Vec<u8>> = events
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, data)| {
                assert_eq!(*kind, EventKind::Read);
                data.clone()
            })
            .collect();
        delivered.sort();
        audited.sort();
        assert_eq!(delivered, audited);
        assert_eq!(delivered.len(), READERS);
    }

    #[test]
    fn write_waits_for_in_flight_read() {
        let hold = Duration::from_millis(100);
        let (primary, started, log) = SlowStream::new(hold);
        let conn = Arc::new(AuditedConnection::new(
            Box::new(primary),
            Box::new(MemoryDrain::default()),
        ));

        let reader = read_in_background(&conn, &started);
        let begun = std::time::Instant::now();
        conn.write(b"/xinfo\0\0").unwrap();

        assert!(begun.elapsed() >= hold / 2, "write did not wait for the read");
        assert_eq!(reader.join().unwrap().unwrap(), 1);
        assert_eq!(log.lock().unwrap().as_slice(), &["read", "write"]);
    }

    #[test]
    fn shutdown_waits_for_in_flight_read() {
        let (primary, started, log) = SlowStream::new(Duration::from_millis(100));
        let drain = MemoryDrain::default();
        let events = Arc::clone(&drain.events);
        let conn = Arc::new(AuditedConnection::new(Box::new(primary), Box::new(drain)));

        let reader = read_in_background(&conn, &started);
        conn.shutdown().unwrap();

        // The read completed and was audited before the drain closed.
        assert_eq!(reader.join().unwrap().unwrap(), 1);
        assert_eq!(log.lock().unwrap().as_slice(), &["read", "close"]);
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[(EventKind::Read, b"r".to_vec())]
        );
        assert!(conn.is_closed());
    }
}
