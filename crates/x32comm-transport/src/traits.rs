use std::io;
use std::time::Duration;

/// A connected, bidirectional byte stream.
///
/// `read` and `write` take `&self` so that several readers can share one
/// stream; implementations serialize internally where they need to.
/// `close` takes `&mut self` and therefore excludes every other call.
pub trait DuplexStream: Send + Sync {
    /// Read one unit of data (one datagram for UDP) into `buf`.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf` as one unit.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Release the stream. Later reads and writes fail with `NotConnected`.
    fn close(&mut self) -> io::Result<()>;

    /// Bound the next reads. `None` blocks indefinitely.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl<T: DuplexStream + ?Sized> DuplexStream for Box<T> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }
}

/// Whether `err` is the result of an expired read timeout.
///
/// Platforms disagree on the kind: Unix reports `WouldBlock`, Windows `TimedOut`.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

pub(crate) fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream is closed")
}
