use rsss_transport::TransportError;

/// Errors that can occur while framing or deframing.
///
/// Losing sync, a bad header checksum and a bad payload trailer are not
/// errors: the scanner keeps scanning and trailer failures are reported
/// through [`Packet::crc_valid`](crate::Packet::crc_valid).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The transport failed; the current frame attempt is abandoned.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error surfaced through an async codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
