//! Bounds-checked little-endian views over a byte region.

use byteorder::{ByteOrder, LittleEndian};

use super::error::WindowError;

/// A read-only view over `[0, len)` of a borrowed buffer.
///
/// Slicing produces another view over the same memory. Every access is
/// checked; nothing is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow<'a> {
    data: &'a [u8],
}

impl<'a> ByteWindow<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    fn field(&self, offset: usize, width: usize) -> Result<&'a [u8], WindowError> {
        offset
            .checked_add(width)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(WindowError::OutOfRange {
                offset,
                width,
                len: self.data.len(),
            })
    }

    pub fn read_u32_le(&self, offset: usize) -> Result<u32, WindowError> {
        self.field(offset, 4).map(LittleEndian::read_u32)
    }

    pub fn read_u64_le(&self, offset: usize) -> Result<u64, WindowError> {
        self.field(offset, 8).map(LittleEndian::read_u64)
    }

    /// Sub-window `[start, end)` relative to this window.
    pub fn slice(&self, start: usize, end: usize) -> Result<ByteWindow<'a>, WindowError> {
        if start > end || end > self.data.len() {
            return Err(WindowError::InvalidRange {
                start,
                end,
                len: self.data.len(),
            });
        }
        Ok(ByteWindow::new(&self.data[start..end]))
    }

    /// A cursor positioned at the start of this window.
    pub fn cursor(&self) -> WindowCursor<'a> {
        WindowCursor {
            window: *self,
            pos: 0,
        }
    }
}

/// Forward-only reader over a [`ByteWindow`].
#[derive(Debug, Clone)]
pub struct WindowCursor<'a> {
    window: ByteWindow<'a>,
    pos: usize,
}

impl<'a> WindowCursor<'a> {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.window.len() - self.pos
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Return the next `n` bytes and move past them.
    pub fn take(&mut self, n: usize) -> Result<ByteWindow<'a>, WindowError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(WindowError::InsufficientData {
                wanted: n,
                remaining,
            });
        }
        let taken = self.window.slice(self.pos, self.pos + n)?;
        self.pos += n;
        Ok(taken)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, WindowError> {
        self.take(4)?.read_u32_le(0)
    }

    pub fn read_u64_le(&mut self) -> Result<u64, WindowError> {
        self.take(8)?.read_u64_le(0)
    }
}
