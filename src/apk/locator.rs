//! Finding the APK Signing Block in front of the central directory.
//!
//! ```text
//! | ZIP entries | size u64 | id/value entries ... | size u64 | "APK Sig Block 42" | central directory | EOCD |
//!               ^ block offset                                                   ^ central directory offset
//! ```
//!
//! The block stores its size at both ends. Both copies must agree before
//! any of its contents are trusted.

use crate::io::ReadAt;

use super::error::{BlockError, Result};
use super::structures::SigningBlockFooter;
use super::window::ByteWindow;

/// Smallest central directory offset that leaves room for a signing block
pub const APK_SIGN_BLOCK_MIN_SIZE: u64 = 32;

/// A validated signing block, read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningBlock {
    offset: u64,
    size: u64,
    data: Vec<u8>,
}

impl SigningBlock {
    /// Offset of the block's first byte in the archive
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The size recorded in the header and footer (total length minus 8)
    pub fn size_field(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset one past the block's last byte, which is where the central
    /// directory starts.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    pub fn window(&self) -> ByteWindow<'_> {
        ByteWindow::new(&self.data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Read and validate the signing block that ends at `cd_offset`.
///
/// # Arguments
///
/// * `reader` - The archive
/// * `cd_offset` - Start of the central directory, from a validated EOCD
///
/// # Returns
///
/// The whole block, leading size field and footer included.
///
/// # Errors
///
/// [`ExtraInfoError::SigningBlockNotFound`](super::ExtraInfoError::SigningBlockNotFound)
/// when `cd_offset` leaves no room for a block, the magic is wrong, the
/// recorded size is out of range or reaches before the start of the file, or
/// the leading and trailing sizes differ. A short read is
/// [`ExtraInfoError::Io`](super::ExtraInfoError::Io).
pub async fn locate_signing_block<R: ReadAt + ?Sized>(
    reader: &R,
    cd_offset: u64,
) -> Result<SigningBlock> {
    if cd_offset < APK_SIGN_BLOCK_MIN_SIZE {
        return Err(BlockError::TooSmall { cd_offset }.into());
    }

    let mut raw = [0u8; SigningBlockFooter::SIZE];
    reader
        .read_exact_at(cd_offset - SigningBlockFooter::SIZE as u64, &mut raw)
        .await?;
    let footer = SigningBlockFooter::from_bytes(&raw)?;

    if !footer.has_valid_magic() {
        return Err(BlockError::MagicMismatch.into());
    }

    let size = footer.size;
    if size < SigningBlockFooter::SIZE as u64 || size > i64::MAX as u64 - 8 {
        return Err(BlockError::SizeOutOfRange { size }.into());
    }

    let total_size = size + 8;
    let Some(offset) = cd_offset.checked_sub(total_size) else {
        return Err(BlockError::OffsetOutOfRange {
            cd_offset,
            total_size,
        }
        .into());
    };
    let len = usize::try_from(total_size).map_err(|_| BlockError::SizeOutOfRange { size })?;

    let mut data = vec![0u8; len];
    reader.read_exact_at(offset, &mut data).await?;

    let header = ByteWindow::new(&data)
        .read_u64_le(0)
        .map_err(BlockError::from)?;
    if header != size {
        return Err(BlockError::SizeMismatch {
            header,
            footer: size,
        }
        .into());
    }

    Ok(SigningBlock { offset, size, data })
}
