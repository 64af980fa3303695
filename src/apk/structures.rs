use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::error::{ExtraInfoError, Result};

/// Entry id reserved for distributor channel metadata
pub const APK_CHANNEL_BLOCK_ID: u32 = 0x7109_8719;

/// Entry id of the APK Signature Scheme v2 payload
pub const APK_SIGNATURE_SCHEME_V2_BLOCK_ID: u32 = 0x7109_871a;

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    pub const CD_OFFSET_FIELD_OFFSET: u64 = 16;
    pub const COMMENT_LEN_FIELD_OFFSET: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ExtraInfoError::NotAZip);
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Central directory size or offset saturated to the ZIP64 marker.
    ///
    /// Entry counts are not consulted: a plain archive may hold exactly
    /// 65535 entries, and the size and offset are all this crate reads.
    pub fn is_zip64(&self) -> bool {
        self.cd_size == 0xFFFFFFFF || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes, immediately before the EOCD
pub struct Zip64EOCDLocator;

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;
}

/// Trailing 24 bytes of an APK Signing Block
///
/// ```text
/// size_of_block: u64   (excludes this field's twin at the head of the block)
/// magic:         [u8; 16] = "APK Sig Block 42"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningBlockFooter {
    pub size: u64,
    pub magic_lo: u64,
    pub magic_hi: u64,
}

impl SigningBlockFooter {
    pub const SIZE: usize = 24;
    pub const MAGIC_LO: u64 = 0x2067_6953_204b_5041;
    pub const MAGIC_HI: u64 = 0x3234_206b_636f_6c42;

    pub fn from_bytes(data: &[u8; Self::SIZE]) -> Result<Self> {
        let mut cursor = Cursor::new(&data[..]);

        Ok(Self {
            size: cursor.read_u64::<LittleEndian>()?,
            magic_lo: cursor.read_u64::<LittleEndian>()?,
            magic_hi: cursor.read_u64::<LittleEndian>()?,
        })
    }

    pub fn new(size: u64) -> Self {
        Self {
            size,
            magic_lo: Self::MAGIC_LO,
            magic_hi: Self::MAGIC_HI,
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic_lo == Self::MAGIC_LO && self.magic_hi == Self::MAGIC_HI
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.size.to_le_bytes());
        out[8..16].copy_from_slice(&self.magic_lo.to_le_bytes());
        out[16..24].copy_from_slice(&self.magic_hi.to_le_bytes());
        out
    }
}
