use crate::error::Result;

/// A duplex byte stream with no message boundaries.
///
/// All operations are non-blocking. `Ok(0)` from [`read`](Transport::read)
/// or [`write`](Transport::write) means "nothing right now, try again later";
/// an `Err` is a fatal failure of the link.
///
/// Read and write sides are driven from different threads by the packet
/// layer, so implementations hand out independent handles to the same link
/// through [`try_clone`](Transport::try_clone).
pub trait Transport: Send {
    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` bytes. Returns `Ok(0)` when no data is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes. Returns `Ok(0)` when the link has no capacity.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Number of bytes a `write` would accept right now.
    ///
    /// Links that cannot tell report `usize::MAX` while writable.
    fn available_for_write(&mut self) -> Result<usize> {
        Ok(usize::MAX)
    }

    /// Create another handle to the same link.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;
}
