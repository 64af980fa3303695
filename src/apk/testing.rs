//! Synthetic archives for unit tests.

use super::eocd::EocdDescriptor;
use super::structures::EndOfCentralDirectory;
use super::writer::SigningBlockBuilder;

pub(crate) fn signing_block(entries: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut builder = SigningBlockBuilder::new();
    for (id, value) in entries {
        builder.push(*id, value).unwrap();
    }
    builder.build()
}

pub(crate) fn eocd_record(cd_offset: u32, cd_size: u32, comment_len: u16) -> Vec<u8> {
    let mut record = Vec::with_capacity(EndOfCentralDirectory::SIZE);
    record.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
    record.extend_from_slice(&[0u8; 4]);
    record.extend_from_slice(&1u16.to_le_bytes());
    record.extend_from_slice(&1u16.to_le_bytes());
    record.extend_from_slice(&cd_size.to_le_bytes());
    record.extend_from_slice(&cd_offset.to_le_bytes());
    record.extend_from_slice(&comment_len.to_le_bytes());
    record
}

pub(crate) struct Archive {
    pub bytes: Vec<u8>,
    pub eocd: EocdDescriptor,
}

/// Lays out `payload | signing block | central directory | EOCD | comment`.
pub(crate) struct ArchiveBuilder {
    payload: Vec<u8>,
    block: Vec<u8>,
    central_directory: Vec<u8>,
    comment: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        let mut central_directory = b"PK\x01\x02".to_vec();
        central_directory.resize(46, 0);
        Self {
            payload: Vec::new(),
            block: Vec::new(),
            central_directory,
            comment: Vec::new(),
        }
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn block(mut self, block: Vec<u8>) -> Self {
        self.block = block;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> Archive {
        let cd_offset = (self.payload.len() + self.block.len()) as u64;
        let cd_size = self.central_directory.len() as u64;
        let eocd_offset = cd_offset + cd_size;

        let mut bytes = self.payload;
        bytes.extend_from_slice(&self.block);
        bytes.extend_from_slice(&self.central_directory);
        bytes.extend_from_slice(&eocd_record(
            cd_offset as u32,
            cd_size as u32,
            self.comment.len() as u16,
        ));
        bytes.extend_from_slice(&self.comment);

        Archive {
            bytes,
            eocd: EocdDescriptor {
                central_directory_offset: cd_offset,
                central_directory_size: cd_size,
                eocd_offset,
            },
        }
    }
}
