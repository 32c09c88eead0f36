/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rsss_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] rsss_frame::FrameError),

    /// Outbound packets must carry at least one byte.
    #[error("packet is empty")]
    EmptyPacket,

    /// The packet exceeds the configured maximum packet size.
    #[error("packet too large ({size} bytes, max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// The outbound queue reached its configured capacity.
    #[error("outbound queue full ({capacity} packets)")]
    QueueFull { capacity: usize },

    /// A transport is already attached to this peer.
    #[error("peer already attached")]
    AlreadyAttached,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, PeerError>;
