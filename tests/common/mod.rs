#![allow(dead_code)]

use apkextra::apk::{EndOfCentralDirectory, SigningBlockBuilder};
use std::io::Write;
use tempfile::NamedTempFile;

/// A signing block holding `entries` in order.
pub fn signing_block(entries: &[(u32, &[u8])]) -> Vec<u8> {
    let mut builder = SigningBlockBuilder::new();
    for (id, value) in entries {
        builder.push(*id, value).unwrap();
    }
    builder.build()
}

/// `payload | block | central directory | EOCD`, returning the bytes and
/// the central directory offset.
pub fn archive(payload: &[u8], block: &[u8]) -> (Vec<u8>, u64) {
    let mut central_directory = b"PK\x01\x02".to_vec();
    central_directory.resize(46, 0x20);

    let cd_offset = (payload.len() + block.len()) as u32;
    let mut bytes = payload.to_vec();
    bytes.extend_from_slice(block);
    bytes.extend_from_slice(&central_directory);

    bytes.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
    bytes.extend_from_slice(&[0u8; 4]);
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&(central_directory.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&cd_offset.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());

    (bytes, cd_offset as u64)
}

pub fn temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
