use super::*;

/// Forward-only reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the source.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    /// Consume exactly `N` bytes.
    ///
    /// On failure the reader does not advance.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let Some(src) = self.bytes.get(self.pos..self.pos + N) else {
            return Err(read_buffer_too_small(N, self.remaining()));
        };
        let mut out = [0u8; N];
        out.copy_from_slice(src);
        self.pos += N;
        Ok(out)
    }

    /// Consume exactly `len` bytes, borrowing them from the source.
    #[inline]
    pub fn read_slice(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(read_buffer_too_small(len, remaining));
        }
        let src = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(src)
    }
}

/// Forward-only writer into a borrowed, fixed-capacity byte slice.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes written so far.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Write all of `src`, or nothing if it does not fit.
    #[inline]
    pub fn write(&mut self, src: &[u8]) -> WriteResult<()> {
        let remaining = self.remaining();
        if src.len() > remaining {
            return Err(write_buffer_too_small(src.len(), remaining));
        }
        self.buf[self.pos..self.pos + src.len()].copy_from_slice(src);
        self.pos += src.len();
        Ok(())
    }

    #[inline]
    pub fn write_array<const N: usize>(&mut self, src: [u8; N]) -> WriteResult<()> {
        self.write(&src)
    }
}
