//! Big-endian cursor over a box payload.
//!
//! Every read is bounds-checked and returns `None` once the payload runs
//! out, so a truncated box stops decoding without panicking.

/// Helper for reading fixed-width big-endian fields from a buffer.
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Read a fixed number of bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        if count > self.remaining() {
            return None;
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Some(slice)
    }

    #[inline]
    pub fn skip(&mut self, count: usize) -> Option<()> {
        self.read_bytes(count).map(|_| ())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a u32 in big-endian format.
    #[inline]
    pub fn read_u32_be(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_be_bytes(bytes.try_into().ok()?))
    }

    /// Read a u64 in big-endian format.
    #[inline]
    pub fn read_u64_be(&mut self) -> Option<u64> {
        let bytes = self.read_bytes(8)?;
        Some(u64::from_be_bytes(bytes.try_into().ok()?))
    }

    /// Read the 4-byte full-box prefix: version byte and 24 flag bits.
    #[inline]
    pub fn read_version_and_flags(&mut self) -> Option<(u8, u32)> {
        let version = self.read_u8()?;
        let flags = self.read_bytes(3)?;
        Some((
            version,
            u32::from_be_bytes([0, flags[0], flags[1], flags[2]]),
        ))
    }
}
