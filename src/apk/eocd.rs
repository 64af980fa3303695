//! Locating the ZIP End of Central Directory.
//!
//! ZIP files are designed to be read from the end. The EOCD sits at the
//! very end of the file unless the archive carries a comment, in which case
//! the last 65535 + 22 bytes are searched backwards for its signature.
//! Only the tail of the archive is read, so this works just as well over
//! HTTP Range requests.

use crate::io::ReadAt;

use super::error::{ExtraInfoError, Result};
use super::structures::{EndOfCentralDirectory, Zip64EOCDLocator};

/// Maximum ZIP comment size allowed by the format (65535 bytes).
const MAX_COMMENT_SIZE: u64 = 65535;

/// Where the central directory and the EOCD sit in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EocdDescriptor {
    pub central_directory_offset: u64,
    pub central_directory_size: u64,
    pub eocd_offset: u64,
}

impl EocdDescriptor {
    /// Build a descriptor, requiring the central directory to end exactly
    /// where the EOCD begins.
    pub fn new(
        central_directory_offset: u64,
        central_directory_size: u64,
        eocd_offset: u64,
    ) -> Result<Self> {
        let descriptor = Self {
            central_directory_offset,
            central_directory_size,
            eocd_offset,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn from_record(eocd: &EndOfCentralDirectory, eocd_offset: u64) -> Result<Self> {
        Self::new(eocd.cd_offset as u64, eocd.cd_size as u64, eocd_offset)
    }

    pub fn validate(&self) -> Result<()> {
        let follows = self
            .central_directory_offset
            .checked_add(self.central_directory_size)
            == Some(self.eocd_offset);

        if self.central_directory_offset >= self.eocd_offset || !follows {
            return Err(ExtraInfoError::StructuralMismatch {
                cd_offset: self.central_directory_offset,
                cd_size: self.central_directory_size,
                eocd_offset: self.eocd_offset,
            });
        }
        Ok(())
    }
}

/// Find and parse the End of Central Directory record.
///
/// Returns the record and its offset in the archive.
pub async fn find_eocd<R: ReadAt + ?Sized>(reader: &R) -> Result<(EndOfCentralDirectory, u64)> {
    let size = reader.size();
    let eocd_size = EndOfCentralDirectory::SIZE as u64;

    if size < eocd_size {
        return Err(ExtraInfoError::NotAZip);
    }

    // Common case first: no archive comment.
    let offset = size - eocd_size;
    let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
    reader.read_exact_at(offset, &mut buf).await?;
    let comment_len_at = EndOfCentralDirectory::COMMENT_LEN_FIELD_OFFSET;
    if &buf[0..4] == EndOfCentralDirectory::SIGNATURE
        && buf[comment_len_at..comment_len_at + 2] == [0u8, 0]
    {
        let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
        return Ok((eocd, offset));
    }

    let search_size = (MAX_COMMENT_SIZE + eocd_size).min(size);
    let search_start = size - search_size;

    let mut buf = vec![0u8; search_size as usize];
    reader.read_exact_at(search_start, &mut buf).await?;

    // Search backwards for the signature; the comment length must account
    // for exactly the bytes that follow the record.
    for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
        if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
            let at = i + comment_len_at;
            let comment_len = u16::from_le_bytes([buf[at], buf[at + 1]]) as usize;

            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }
    }

    Err(ExtraInfoError::NotAZip)
}

/// Whether a ZIP64 EOCD locator sits immediately before the EOCD.
pub async fn is_zip64_locator_present<R: ReadAt + ?Sized>(
    reader: &R,
    eocd_offset: u64,
) -> Result<bool> {
    let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
        return Ok(false);
    };

    let mut sig = [0u8; 4];
    reader.read_exact_at(locator_offset, &mut sig).await?;
    Ok(&sig[..] == Zip64EOCDLocator::SIGNATURE)
}

/// Locate the EOCD and describe the central directory, rejecting ZIP64
/// archives before anything else is read.
pub async fn locate_eocd<R: ReadAt + ?Sized>(reader: &R) -> Result<EocdDescriptor> {
    let (eocd, eocd_offset) = find_eocd(reader).await?;

    if eocd.is_zip64() || is_zip64_locator_present(reader, eocd_offset).await? {
        return Err(ExtraInfoError::Zip64NotSupported);
    }

    EocdDescriptor::from_record(&eocd, eocd_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apk::testing::{ArchiveBuilder, eocd_record};
    use crate::io::MemoryReader;

    #[test]
    fn descriptor_requires_adjacent_eocd() {
        assert!(EocdDescriptor::new(100, 50, 150).is_ok());
        assert!(matches!(
            EocdDescriptor::new(100, 40, 150),
            Err(ExtraInfoError::StructuralMismatch { .. })
        ));
        assert!(matches!(
            EocdDescriptor::new(150, 0, 150),
            Err(ExtraInfoError::StructuralMismatch { .. })
        ));
        assert!(matches!(
            EocdDescriptor::new(u64::MAX, 2, 1),
            Err(ExtraInfoError::StructuralMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn finds_eocd_without_comment() {
        let archive = ArchiveBuilder::new().build();
        let len = archive.bytes.len() as u64;
        let reader = MemoryReader::new(archive.bytes);

        let (_, offset) = find_eocd(&reader).await.unwrap();
        assert_eq!(offset, len - 22);

        let descriptor = locate_eocd(&reader).await.unwrap();
        assert_eq!(descriptor, archive.eocd);
    }

    #[tokio::test]
    async fn finds_eocd_behind_comment() {
        let archive = ArchiveBuilder::new().comment(b"built by ci").build();
        let reader = MemoryReader::new(archive.bytes);

        let descriptor = locate_eocd(&reader).await.unwrap();
        assert_eq!(descriptor, archive.eocd);
    }

    #[tokio::test]
    async fn rejects_non_zip() {
        let reader = MemoryReader::new(vec![0x55; 4096]);
        assert!(matches!(
            locate_eocd(&reader).await,
            Err(ExtraInfoError::NotAZip)
        ));

        let tiny = MemoryReader::new(vec![0u8; 10]);
        assert!(matches!(
            find_eocd(&tiny).await,
            Err(ExtraInfoError::NotAZip)
        ));
    }

    #[tokio::test]
    async fn rejects_zip64_locator() {
        let mut bytes = vec![0u8; 64];
        bytes[44..48].copy_from_slice(Zip64EOCDLocator::SIGNATURE);
        bytes.extend_from_slice(&eocd_record(0, 64, 0));
        let reader = MemoryReader::new(bytes);

        assert!(is_zip64_locator_present(&reader, 64).await.unwrap());
        assert!(!is_zip64_locator_present(&reader, 10).await.unwrap());
        assert!(matches!(
            locate_eocd(&reader).await,
            Err(ExtraInfoError::Zip64NotSupported)
        ));
    }

    #[tokio::test]
    async fn rejects_zip64_marker_fields() {
        let mut bytes = vec![0u8; 32];
        bytes.extend_from_slice(&eocd_record(0xFFFF_FFFF, 0xFFFF_FFFF, 0));
        let reader = MemoryReader::new(bytes);

        assert!(matches!(
            locate_eocd(&reader).await,
            Err(ExtraInfoError::Zip64NotSupported)
        ));
    }

    #[tokio::test]
    async fn full_entry_count_is_not_zip64() {
        let archive = ArchiveBuilder::new().build();
        let mut bytes = archive.bytes;
        let eocd = archive.eocd.eocd_offset as usize;
        bytes[eocd + 8..eocd + 12].copy_from_slice(&[0xFF; 4]);
        let reader = MemoryReader::new(bytes);

        let (record, _) = find_eocd(&reader).await.unwrap();
        assert_eq!(record.total_entries, 0xFFFF);
        assert_eq!(locate_eocd(&reader).await.unwrap(), archive.eocd);
    }

    #[tokio::test]
    async fn rejects_gap_between_cd_and_eocd() {
        let mut bytes = vec![0u8; 100];
        // central directory claims 0..40, EOCD sits at 100
        bytes.extend_from_slice(&eocd_record(0, 40, 0));
        let reader = MemoryReader::new(bytes);

        assert!(matches!(
            locate_eocd(&reader).await,
            Err(ExtraInfoError::StructuralMismatch {
                cd_offset: 0,
                cd_size: 40,
                eocd_offset: 100
            })
        ));
    }
}
