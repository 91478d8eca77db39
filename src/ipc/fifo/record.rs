/*!
 * Fifo Records
 * Fixed-size element encoding for typed fifo access
 */

/// A value that travels through a fifo as one fixed-size element
pub trait FifoRecord: Copy {
    /// Element size in bytes; must match the fifo's element size
    const SIZE: usize;

    /// Encode into exactly `SIZE` bytes
    fn encode(&self, out: &mut [u8]);

    /// Decode from exactly `SIZE` bytes
    fn decode(bytes: &[u8]) -> Self;
}

impl FifoRecord for u64 {
    const SIZE: usize = std::mem::size_of::<u64>();

    #[inline]
    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_ne_bytes());
    }

    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        u64::from_ne_bytes(raw)
    }
}

impl FifoRecord for u32 {
    const SIZE: usize = std::mem::size_of::<u32>();

    #[inline]
    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_ne_bytes());
    }

    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        u32::from_ne_bytes(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_is_native_endian() {
        let mut out = [0u8; 8];
        0x0102_0304_0506_0708u64.encode(&mut out);
        assert_eq!(out, 0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(u64::decode(&out), 0x0102_0304_0506_0708);
    }
}
