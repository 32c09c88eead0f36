use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::UnixTransport;

/// Listening Unix domain socket that yields [`UnixTransport`] connections.
///
/// Handy for bridging a serial line through `socat` or for testing two
/// processes against each other. The socket file is removed on drop.
pub struct UnixSocketListener {
    listener: UnixListener,
    path: PathBuf,
}

impl UnixSocketListener {
    #[cfg(target_os = "macos")]
    const MAX_PATH_LEN: usize = 104;
    #[cfg(not(target_os = "macos"))]
    const MAX_PATH_LEN: usize = 108;

    /// Bind a filesystem-path socket, replacing a stale socket file if present.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(TransportError::Bind {
                    path,
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|source| TransportError::Bind {
                path: path.clone(),
                source,
            })?;
        }

        let listener = UnixListener::bind(&path).map_err(|source| TransportError::Bind {
            path: path.clone(),
            source,
        })?;
        info!(?path, "listening on unix domain socket");

        Ok(Self { listener, path })
    }

    /// Accept one connection (blocking) and return it as a non-blocking transport.
    pub fn accept(&self) -> Result<UnixTransport> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        UnixTransport::from_unix(stream)
    }

    /// Connect to a listening socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<UnixTransport> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "connected to unix domain socket");
        UnixTransport::from_unix(stream)
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Transport;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rsss-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("uds");
        let sock_path = dir.join("link.sock");
        let listener = UnixSocketListener::bind(&sock_path).unwrap();
        assert_eq!(listener.path(), sock_path.as_path());

        let path_clone = sock_path.clone();
        let client = std::thread::spawn(move || {
            let mut client = UnixSocketListener::connect(&path_clone).unwrap();
            while client.write(b"hello").unwrap() == 0 {}
        });

        let mut server = listener.accept().unwrap();
        client.join().unwrap();

        let mut buf = [0u8; 5];
        let mut filled = 0;
        while filled < buf.len() {
            filled += server.read(&mut buf[filled..]).unwrap();
        }
        assert_eq!(&buf, b"hello");

        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = UnixSocketListener::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_rejects_regular_file() {
        let dir = temp_dir("uds-file");
        let path = dir.join("plain.sock");
        std::fs::write(&path, b"not a socket").unwrap();

        let result = UnixSocketListener::bind(&path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
