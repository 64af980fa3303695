//! Text key to entry id mapping.
//!
//! The first four UTF-8 bytes of the key are packed big-endian into a `u32`,
//! missing bytes count as zero. Keys sharing their first four bytes map to the
//! same id. Existing signed packages rely on this layout, so it must not change.
//!
//! Bytes are packed unsigned. Tools that shift signed bytes (the Java
//! `byte << shift` idiom) sign-extend anything at or above 0x80 and derive a
//! different id for non-ASCII keys: `"é"` is `0xc3a90000` here but
//! `0xffa90000` there. Only ASCII keys give the same id everywhere.

use byteorder::{BigEndian, ByteOrder};

use super::error::{ExtraInfoError, Result};

pub fn key_to_id(key: &str) -> Result<u32> {
    if key.is_empty() {
        return Err(ExtraInfoError::InvalidKey);
    }

    let bytes = key.as_bytes();
    let n = bytes.len().min(4);
    let mut packed = [0u8; 4];
    packed[..n].copy_from_slice(&bytes[..n]);

    Ok(BigEndian::read_u32(&packed))
}
