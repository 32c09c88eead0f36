use crate::codec::{Header, HEADER_SIZE};

/// Sliding-window header detector.
///
/// Every incoming byte shifts the window left by one, so every possible
/// header alignment is tested. Noise (including a byte sequence that looks
/// like a marker but fails its checksum) just scrolls out of the window.
#[derive(Debug, Clone, Default)]
pub struct SyncScanner {
    window: [u8; HEADER_SIZE],
}

impl SyncScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the announced payload length when the window
    /// now holds a valid header; the window is zeroed in that case.
    pub fn push(&mut self, byte: u8) -> Option<u16> {
        self.window.copy_within(1.., 0);
        self.window[HEADER_SIZE - 1] = byte;

        let header = Header::decode(&self.window)?;
        self.reset();
        Some(header.length)
    }

    /// Forget any partially seen header.
    pub fn reset(&mut self) {
        self.window = [0; HEADER_SIZE];
    }

    /// The current window contents, oldest byte first.
    pub fn window(&self) -> &[u8; HEADER_SIZE] {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(scanner: &mut SyncScanner, bytes: &[u8]) -> Option<(usize, u16)> {
        bytes
            .iter()
            .enumerate()
            .find_map(|(i, &b)| scanner.push(b).map(|len| (i, len)))
    }

    #[test]
    fn finds_header_after_any_amount_of_garbage() {
        for garbage in [0usize, 1, 4, 1000] {
            let mut stream: Vec<u8> = (0..garbage).map(|i| (i * 37 % 251) as u8).collect();
            stream.extend_from_slice(&Header::new(300).encode());

            let mut scanner = SyncScanner::new();
            let found = scan(&mut scanner, &stream);
            assert_eq!(found, Some((stream.len() - 1, 300)), "garbage={garbage}");
        }
    }

    #[test]
    fn header_split_across_feeds_is_kept() {
        let header = Header::new(7).encode();
        let mut scanner = SyncScanner::new();

        assert_eq!(scan(&mut scanner, &[0x13, 0x37]), None);
        assert_eq!(scan(&mut scanner, &header[..2]), None);
        assert_eq!(scan(&mut scanner, &header[2..]), Some((1, 7)));
    }

    #[test]
    fn window_is_zeroed_after_header() {
        let mut scanner = SyncScanner::new();
        assert!(scan(&mut scanner, &Header::new(1).encode()).is_some());
        assert_eq!(scanner.window(), &[0; HEADER_SIZE]);
    }

    #[test]
    fn marker_with_bad_checksum_is_skipped() {
        let mut bogus = Header::new(9).encode();
        bogus[3] ^= 0xFF;
        let mut stream = bogus.to_vec();
        stream.extend_from_slice(&Header::new(2).encode());

        let mut scanner = SyncScanner::new();
        assert_eq!(scan(&mut scanner, &stream), Some((7, 2)));
    }

    #[test]
    fn zero_length_header_is_reported() {
        let mut scanner = SyncScanner::new();
        assert_eq!(scan(&mut scanner, &Header::new(0).encode()), Some((3, 0)));
    }

    #[test]
    fn all_zero_window_is_not_a_header() {
        let mut scanner = SyncScanner::new();
        assert_eq!(scan(&mut scanner, &[0; 16]), None);
    }
}
