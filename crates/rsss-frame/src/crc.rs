//! Checksums used on the wire.
//!
//! Both are plain seeded CRCs with no final xor, so a running value can be
//! fed back in as the seed of the next chunk.

/// CRC-8 guarding the frame header (polynomial 0x07, MSB first, SMBus parameters).
pub mod crc8 {
    use ::crc::{Crc, CRC_8_SMBUS};

    const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

    /// Checksum of `data` starting from `seed`.
    pub fn calc(data: &[u8], seed: u8) -> u8 {
        let mut digest = CRC8.digest_with_initial(seed);
        digest.update(data);
        digest.finalize()
    }

    /// Append the checksum of the current contents and return it.
    pub fn append(buf: &mut Vec<u8>, seed: u8) -> u8 {
        let crc = calc(buf, seed);
        buf.push(crc);
        crc
    }

    /// Check that the last byte is the checksum of the bytes before it.
    pub fn validate(data: &[u8], seed: u8) -> bool {
        match data.split_last() {
            Some((&stored, body)) => calc(body, seed) == stored,
            None => false,
        }
    }
}

/// CRC-16 guarding the payload trailer (reflected polynomial 0xA001, ARC parameters).
pub mod crc16 {
    use ::crc::{Crc, CRC_16_ARC};

    const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

    /// Checksum of `data` starting from `seed`.
    ///
    /// `seed` is the raw register value; the reflected algorithm wants its
    /// initial value bit-reversed, so it is flipped on the way in.
    pub fn calc(data: &[u8], seed: u16) -> u16 {
        let mut digest = CRC16.digest_with_initial(seed.reverse_bits());
        digest.update(data);
        digest.finalize()
    }

    /// Append the checksum of the current contents (little-endian) and return it.
    pub fn append(buf: &mut Vec<u8>, seed: u16) -> u16 {
        let crc = calc(buf, seed);
        buf.extend_from_slice(&crc.to_le_bytes());
        crc
    }

    /// Check that the last two bytes are the little-endian checksum of the rest.
    pub fn validate(data: &[u8], seed: u16) -> bool {
        if data.len() < 2 {
            return false;
        }
        let (body, trailer) = data.split_at(data.len() - 2);
        calc(body, seed).to_le_bytes() == [trailer[0], trailer[1]]
    }
}
