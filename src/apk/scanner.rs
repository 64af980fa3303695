//! Walking the id/value entries of a signing block.
//!
//! Between the leading size field and the 24-byte footer the block holds a
//! sequence of entries:
//!
//! ```text
//! len:   u64 LE   (counts id + value)
//! id:    u32 LE
//! value: [u8; len - 4]
//! ```
//!
//! Entries are visited in file order and every length is checked against the
//! bytes that are actually left before it is used.

use super::error::{EntryError, ExtraInfoError, Result};
use super::structures::SigningBlockFooter;
use super::window::{ByteWindow, WindowCursor};

/// Size of the length prefix of each entry
const ENTRY_LEN_SIZE: usize = 8;
/// Size of the id field of each entry
const ENTRY_ID_SIZE: u64 = 4;

/// One id/value pair, borrowing from the signing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub id: u32,
    pub value: &'a [u8],
}

/// Iterator over the entries of a signing block.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    cursor: WindowCursor<'a>,
    index: usize,
    failed: bool,
}

impl<'a> Entries<'a> {
    fn read_entry(&mut self) -> Result<Entry<'a>, EntryError> {
        let entry = self.index;

        let remaining = self.cursor.remaining();
        if remaining < ENTRY_LEN_SIZE {
            return Err(EntryError::Truncated { entry, remaining });
        }
        let len = self.cursor.read_u64_le()?;

        let available = self.cursor.remaining();
        if len < ENTRY_ID_SIZE || len > i32::MAX as u64 || len > available as u64 {
            return Err(EntryError::LenOutOfRange {
                entry,
                len,
                available,
            });
        }

        let mut body = self.cursor.take(len as usize)?.cursor();
        let id = body.read_u32_le()?;
        let value = body.take(body.remaining())?;

        Ok(Entry {
            id,
            value: value.as_bytes(),
        })
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>, EntryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.cursor.has_remaining() {
            return None;
        }

        self.index += 1;
        match self.read_entry() {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterate the entries of a whole signing block (size field and footer included).
pub fn entries(block: ByteWindow<'_>) -> Result<Entries<'_>, EntryError> {
    let end = block.len().saturating_sub(SigningBlockFooter::SIZE);
    let pairs = block.slice(ENTRY_LEN_SIZE, end)?;

    Ok(Entries {
        cursor: pairs.cursor(),
        index: 0,
        failed: false,
    })
}

/// Return the value of the first entry carrying `target_id`.
///
/// # Errors
///
/// [`ExtraInfoError::EntryMalformed`] when an entry ahead of the match is
/// truncated or overruns the block, [`ExtraInfoError::IdNotFound`] when the
/// scan ends without a match.
pub fn find_entry(block: ByteWindow<'_>, target_id: u32) -> Result<&[u8]> {
    for entry in entries(block)? {
        let entry = entry?;
        if entry.id == target_id {
            return Ok(entry.value);
        }
    }
    Err(ExtraInfoError::IdNotFound { id: target_id })
}
