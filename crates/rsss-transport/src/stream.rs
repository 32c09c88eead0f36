use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Streams that can hand out a second descriptor for the same link.
pub trait CloneableStream: Read + Write + AsRawFd + Send + Sized {
    fn clone_stream(&self) -> std::io::Result<Self>;
}

impl CloneableStream for UnixStream {
    fn clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }
}

impl CloneableStream for File {
    fn clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }
}

/// A non-blocking file-descriptor stream used as a [`Transport`].
///
/// `available` asks the kernel (`FIONREAD`) how many bytes are queued, so the
/// sync scanner never blocks. `WouldBlock` and `Interrupted` map to `Ok(0)`.
#[derive(Debug)]
pub struct StreamTransport<S> {
    inner: S,
    eof_is_fatal: bool,
}

/// Unix domain socket transport.
pub type UnixTransport = StreamTransport<UnixStream>;

/// Serial (tty) device transport.
pub type SerialTransport = StreamTransport<File>;

impl StreamTransport<UnixStream> {
    /// Wrap a connected socket, switching it to non-blocking mode.
    ///
    /// A zero-byte read on a socket means the peer hung up, which is fatal.
    pub fn from_unix(stream: UnixStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            inner: stream,
            eof_is_fatal: true,
        })
    }
}

impl StreamTransport<File> {
    /// Open a serial device without making it the controlling terminal.
    ///
    /// Line settings (baud rate, raw mode) are left as configured by the
    /// system, e.g. through `stty`. A zero-byte read is treated as "no data".
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?path, "opened serial device");
        Ok(Self {
            inner: file,
            eof_is_fatal: false,
        })
    }
}

impl<S: CloneableStream> StreamTransport<S> {
    /// Peek one byte without consuming it; `Ok(false)` means the peer hung up.
    ///
    /// Only meaningful for sockets, where `FIONREAD == 0` cannot tell an idle
    /// link from a closed one.
    fn peer_connected(&self) -> Result<bool> {
        let mut peeked = 0u8;
        // SAFETY: `peeked` is a valid one-byte buffer and the descriptor is open
        // for the lifetime of `self.inner`. MSG_PEEK leaves the byte queued.
        let rc = unsafe {
            libc::recv(
                self.inner.as_raw_fd(),
                (&mut peeked as *mut u8).cast(),
                1,
                libc::MSG_PEEK | libc::MSG_DONTWAIT,
            )
        };
        if rc == 0 {
            return Ok(false);
        }
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if !is_transient(err.kind()) {
                return Err(err.into());
            }
        }
        Ok(true)
    }
}

impl<S: CloneableStream> Transport for StreamTransport<S> {
    fn available(&mut self) -> Result<usize> {
        let mut count: libc::c_int = 0;
        // SAFETY: `count` is a valid writable c_int and the descriptor is open
        // for the lifetime of `self.inner`.
        let rc = unsafe {
            libc::ioctl(
                self.inner.as_raw_fd(),
                libc::FIONREAD,
                &mut count as *mut libc::c_int,
            )
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        let count = usize::try_from(count).unwrap_or(0);
        if count == 0 && self.eof_is_fatal && !self.peer_connected()? {
            return Err(TransportError::Closed);
        }
        Ok(count)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.inner.read(buf) {
            Ok(0) if self.eof_is_fatal => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(err) if is_transient(err.kind()) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.inner.write(buf) {
            Ok(n) => Ok(n),
            Err(err) if is_transient(err.kind()) => Ok(0),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => Err(TransportError::Closed),
            Err(err) => Err(err.into()),
        }
    }

    fn available_for_write(&mut self) -> Result<usize> {
        let mut fds = libc::pollfd {
            fd: self.inner.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        };
        // SAFETY: `fds` is one valid pollfd and a zero timeout never blocks.
        let rc = unsafe { libc::poll(&mut fds, 1, 0) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if is_transient(err.kind()) {
                return Ok(0);
            }
            return Err(err.into());
        }
        if fds.revents & (libc::POLLHUP | libc::POLLERR) != 0 {
            return Err(TransportError::Closed);
        }
        // The kernel does not say how much room is left, only whether there is any.
        if fds.revents & libc::POLLOUT != 0 {
            Ok(usize::MAX)
        } else {
            Ok(0)
        }
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            inner: self.inner.clone_stream()?,
            eof_is_fatal: self.eof_is_fatal,
        })
    }
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::Interrupted)
}
