use std::sync::Arc;
use tracing::debug;

use crate::io::ReadAt;

use super::eocd::{EocdDescriptor, locate_eocd};
use super::error::{ExtraInfoError, Result};
use super::key::key_to_id;
use super::locator::{SigningBlock, locate_signing_block};
use super::scanner::{entries, find_entry};
use super::structures::{APK_CHANNEL_BLOCK_ID, APK_SIGNATURE_SCHEME_V2_BLOCK_ID};

/// Reads vendor metadata out of an APK's signing block.
///
/// Every call re-reads the signing block; nothing is cached between calls.
///
/// ## Example
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use apkextra::{ExtraInfoReader, LocalFileReader};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let reader = ExtraInfoReader::new(Arc::new(LocalFileReader::new(Path::new("app.apk"))?));
///     let eocd = reader.eocd().await?;
///     let channel = reader.get_channel_info(&eocd).await?;
///     println!("{}", String::from_utf8_lossy(&channel));
///     Ok(())
/// }
/// ```
pub struct ExtraInfoReader<R: ReadAt + ?Sized> {
    reader: Arc<R>,
}

impl<R: ReadAt + ?Sized> ExtraInfoReader<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Locate the central directory of the archive.
    ///
    /// # Errors
    ///
    /// [`ExtraInfoError::NotAZip`] when no EOCD record is found,
    /// [`ExtraInfoError::Zip64NotSupported`] for ZIP64 archives and
    /// [`ExtraInfoError::StructuralMismatch`] when the central directory does
    /// not end where the EOCD begins.
    pub async fn eocd(&self) -> Result<EocdDescriptor> {
        let eocd = locate_eocd(self.reader.as_ref()).await?;
        debug!(
            cd_offset = eocd.central_directory_offset,
            cd_size = eocd.central_directory_size,
            eocd_offset = eocd.eocd_offset,
            "located end of central directory"
        );
        Ok(eocd)
    }

    /// Read and validate the signing block in front of the central directory.
    pub async fn signing_block(&self, eocd: &EocdDescriptor) -> Result<SigningBlock> {
        eocd.validate()?;
        let block =
            locate_signing_block(self.reader.as_ref(), eocd.central_directory_offset).await?;
        debug!(
            offset = block.offset(),
            len = block.len(),
            "located APK Signing Block"
        );
        Ok(block)
    }

    /// Value stored under `id`.
    ///
    /// # Errors
    ///
    /// Besides the archive-level errors of [`eocd`](Self::eocd):
    /// [`ExtraInfoError::SigningBlockNotFound`] when the block is missing or
    /// invalid, [`ExtraInfoError::EntryMalformed`] when an entry ahead of the
    /// match is corrupt, and [`ExtraInfoError::IdNotFound`] when no entry
    /// carries `id`.
    pub async fn get_extra_info_by_id(&self, eocd: &EocdDescriptor, id: u32) -> Result<Vec<u8>> {
        let block = self.signing_block(eocd).await?;
        let value = find_entry(block.window(), id)?;
        Ok(value.to_vec())
    }

    /// Distributor channel.
    ///
    /// # Errors
    ///
    /// Signing block failures and a missing entry are reported as
    /// [`ExtraInfoError::ChannelNotFound`] with the underlying error as its
    /// source. I/O and ZIP structure errors are returned unchanged.
    pub async fn get_channel_info(&self, eocd: &EocdDescriptor) -> Result<Vec<u8>> {
        self.get_extra_info_by_id(eocd, APK_CHANNEL_BLOCK_ID)
            .await
            .map_err(|e| relabel(e, |e| ExtraInfoError::ChannelNotFound(Box::new(e))))
    }

    /// APK Signature Scheme v2 payload.
    ///
    /// # Errors
    ///
    /// As [`get_channel_info`](Self::get_channel_info), with
    /// [`ExtraInfoError::SignatureNotFound`] as the wrapper.
    pub async fn get_signature_info(&self, eocd: &EocdDescriptor) -> Result<Vec<u8>> {
        self.get_extra_info_by_id(eocd, APK_SIGNATURE_SCHEME_V2_BLOCK_ID)
            .await
            .map_err(|e| relabel(e, |e| ExtraInfoError::SignatureNotFound(Box::new(e))))
    }

    /// Value stored under the id derived from a short text key.
    ///
    /// # Arguments
    ///
    /// * `eocd` - Layout returned by [`eocd`](Self::eocd)
    /// * `key` - Text key; only its first four UTF-8 bytes are significant
    ///
    /// # Errors
    ///
    /// [`ExtraInfoError::InvalidKey`] for an empty key. Otherwise as
    /// [`get_channel_info`](Self::get_channel_info), with
    /// [`ExtraInfoError::ExtraInfoNotFound`] naming the key as the wrapper.
    pub async fn get_extra_info(&self, eocd: &EocdDescriptor, key: &str) -> Result<Vec<u8>> {
        let id = key_to_id(key)?;
        self.get_extra_info_by_id(eocd, id).await.map_err(|e| {
            relabel(e, |e| ExtraInfoError::ExtraInfoNotFound {
                key: key.to_string(),
                source: Box::new(e),
            })
        })
    }

    /// Whether the signing block holds an entry with `id`.
    ///
    /// An archive without a readable signing block holds nothing.
    pub async fn has_extra_info(&self, eocd: &EocdDescriptor, id: u32) -> Result<bool> {
        match self.get_extra_info_by_id(eocd, id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_block_level() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn has_v2_signature(&self, eocd: &EocdDescriptor) -> Result<bool> {
        self.has_extra_info(eocd, APK_SIGNATURE_SCHEME_V2_BLOCK_ID)
            .await
    }

    /// All `(id, value)` entries in file order.
    pub async fn entries(&self, eocd: &EocdDescriptor) -> Result<Vec<(u32, Vec<u8>)>> {
        let block = self.signing_block(eocd).await?;
        let mut out = Vec::new();
        for entry in entries(block.window())? {
            let entry = entry?;
            out.push((entry.id, entry.value.to_vec()));
        }
        Ok(out)
    }
}

/// Wrap signing block failures in the caller-specific "not found" error,
/// leaving archive-level failures as they are.
fn relabel(e: ExtraInfoError, wrap: impl FnOnce(ExtraInfoError) -> ExtraInfoError) -> ExtraInfoError {
    if e.is_block_level() { wrap(e) } else { e }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apk::testing::{ArchiveBuilder, signing_block};
    use crate::io::MemoryReader;
    use std::error::Error;

    fn reader_for(bytes: Vec<u8>) -> ExtraInfoReader<MemoryReader> {
        ExtraInfoReader::new(Arc::new(MemoryReader::new(bytes)))
    }

    /// Central directory at 1000, a 64-byte signing block at 936 holding the
    /// channel entry and a one-byte filler entry.
    fn release_archive() -> Vec<u8> {
        let block = signing_block(&[
            (APK_CHANNEL_BLOCK_ID, b"release".to_vec()),
            (0x0000_0001, vec![0]),
        ]);
        assert_eq!(block.len(), 64);

        let archive = ArchiveBuilder::new()
            .payload(vec![0x11; 936])
            .block(block)
            .build();
        assert_eq!(archive.eocd.central_directory_offset, 1000);
        archive.bytes
    }

    #[tokio::test]
    async fn channel_from_release_archive() {
        let reader = reader_for(release_archive());
        let eocd = reader.eocd().await.unwrap();
        assert_eq!(eocd.central_directory_offset, 1000);

        let block = reader.signing_block(&eocd).await.unwrap();
        assert_eq!(block.offset(), 936);

        assert_eq!(reader.get_channel_info(&eocd).await.unwrap(), b"release");
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let reader = reader_for(release_archive());
        let eocd = reader.eocd().await.unwrap();

        let err = reader.get_extra_info(&eocd, "zzzz").await.unwrap_err();
        assert!(err.is_not_found());
        match &err {
            ExtraInfoError::ExtraInfoNotFound { key, source } => {
                assert_eq!(key, "zzzz");
                assert!(matches!(
                    **source,
                    ExtraInfoError::IdNotFound { id: 0x7a7a_7a7a }
                ));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.source().is_some());
    }

    #[tokio::test]
    async fn empty_key_is_invalid() {
        let reader = reader_for(release_archive());
        let eocd = reader.eocd().await.unwrap();
        assert!(matches!(
            reader.get_extra_info(&eocd, "").await,
            Err(ExtraInfoError::InvalidKey)
        ));
    }

    #[tokio::test]
    async fn missing_block_surfaces_per_entry_point() {
        let archive = ArchiveBuilder::new().payload(vec![0u8; 300]).build();
        let reader = reader_for(archive.bytes);
        let eocd = reader.eocd().await.unwrap();

        match reader.get_channel_info(&eocd).await {
            Err(ExtraInfoError::ChannelNotFound(source)) => {
                assert!(matches!(*source, ExtraInfoError::SigningBlockNotFound(_)))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            reader.get_signature_info(&eocd).await,
            Err(ExtraInfoError::SignatureNotFound(_))
        ));
        assert!(!reader.has_v2_signature(&eocd).await.unwrap());
    }

    #[tokio::test]
    async fn repeated_signature_reads_agree() {
        let archive = ArchiveBuilder::new()
            .block(signing_block(&[(APK_SIGNATURE_SCHEME_V2_BLOCK_ID, vec![0x3c; 96])]))
            .build();
        let reader = reader_for(archive.bytes);
        let eocd = reader.eocd().await.unwrap();

        let first = reader.get_signature_info(&eocd).await.unwrap();
        let second = reader.get_signature_info(&eocd).await.unwrap();
        assert_eq!(first, vec![0x3c; 96]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn signature_payload() {
        let archive = ArchiveBuilder::new()
            .payload(vec![0u8; 40])
            .block(signing_block(&[(APK_SIGNATURE_SCHEME_V2_BLOCK_ID, vec![0xA5; 300])]))
            .build();
        let reader = reader_for(archive.bytes);
        let eocd = reader.eocd().await.unwrap();

        assert_eq!(reader.get_signature_info(&eocd).await.unwrap(), vec![0xA5; 300]);
        assert!(reader.has_v2_signature(&eocd).await.unwrap());
        assert!(!reader.has_extra_info(&eocd, APK_CHANNEL_BLOCK_ID).await.unwrap());
        assert!(matches!(
            reader.get_channel_info(&eocd).await,
            Err(ExtraInfoError::ChannelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_descriptor_is_rejected_before_reading() {
        let reader = reader_for(release_archive());
        let bogus = EocdDescriptor {
            central_directory_offset: 1000,
            central_directory_size: 1,
            eocd_offset: 5000,
        };
        assert!(matches!(
            reader.get_channel_info(&bogus).await,
            Err(ExtraInfoError::StructuralMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn repeated_calls_agree() {
        let reader = reader_for(release_archive());
        let eocd = reader.eocd().await.unwrap();

        let first = reader.get_channel_info(&eocd).await.unwrap();
        let second = reader.get_channel_info(&eocd).await.unwrap();
        assert_eq!(first, second);

        let a = reader.get_signature_info(&eocd).await.unwrap_err();
        let b = reader.get_signature_info(&eocd).await.unwrap_err();
        assert!(matches!(a, ExtraInfoError::SignatureNotFound(_)));
        assert_eq!(a.to_string(), b.to_string());

        let a = reader.get_extra_info(&eocd, "zzzz").await.unwrap_err();
        let b = reader.get_extra_info(&eocd, "zzzz").await.unwrap_err();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[tokio::test]
    async fn lists_entries_in_order() {
        let reader = reader_for(release_archive());
        let eocd = reader.eocd().await.unwrap();
        let all = reader.entries(&eocd).await.unwrap();
        assert_eq!(
            all,
            vec![
                (APK_CHANNEL_BLOCK_ID, b"release".to_vec()),
                (1, vec![0]),
            ]
        );
    }
}
