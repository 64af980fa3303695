//! Injecting id/value entries into an existing signing block.
//!
//! The archive is rewritten as
//!
//! ```text
//! | ZIP entries (copied) | rebuilt signing block | central directory (copied) | EOCD (cd offset patched) |
//! ```
//!
//! Entries already present are carried over in order, except those with the
//! id being written.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::io::ReadAt;

use super::eocd::locate_eocd;
use super::error::{EntryError, ExtraInfoError, Result};
use super::key::key_to_id;
use super::locator::locate_signing_block;
use super::scanner::entries;
use super::structures::{APK_CHANNEL_BLOCK_ID, EndOfCentralDirectory, SigningBlockFooter};

/// Chunk size used when copying untouched archive regions
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Encode one `len | id | value` entry.
pub fn encode_entry(id: u32, value: &[u8]) -> Vec<u8> {
    let len = value.len() as u64 + 4;
    let mut out = Vec::with_capacity(12 + value.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(value);
    out
}

/// Assembles a complete signing block: size, entries, size, magic.
#[derive(Debug, Default, Clone)]
pub struct SigningBlockBuilder {
    pairs: Vec<u8>,
}

impl SigningBlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: u32, value: &[u8]) -> Result<&mut Self> {
        let len = value.len() as u64 + 4;
        if len > i32::MAX as u64 {
            return Err(EntryError::LenOutOfRange {
                entry: 0,
                len,
                available: i32::MAX as usize,
            }
            .into());
        }
        self.pairs.extend_from_slice(&encode_entry(id, value));
        Ok(self)
    }

    pub fn build(&self) -> Vec<u8> {
        let size = (self.pairs.len() + SigningBlockFooter::SIZE) as u64;
        let mut block = Vec::with_capacity(self.pairs.len() + 32);
        block.extend_from_slice(&size.to_le_bytes());
        block.extend_from_slice(&self.pairs);
        block.extend_from_slice(&SigningBlockFooter::new(size).to_bytes());
        block
    }
}

/// Writes copies of an archive with extra entries in its signing block.
pub struct ExtraInfoWriter<R: ReadAt + ?Sized> {
    reader: Arc<R>,
    source_path: Option<PathBuf>,
}

impl<R: ReadAt + ?Sized> ExtraInfoWriter<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            reader,
            source_path: None,
        }
    }

    /// Remember where the source archive lives so that writing over it is
    /// refused.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub(crate) fn source(&self) -> &Arc<R> {
        &self.reader
    }

    /// Write the archive to `out` with `value` stored under `id`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Fails before anything is written when the archive is not a ZIP, is
    /// ZIP64, has no valid signing block or holds a malformed entry.
    /// [`ExtraInfoError::OffsetOverflow`] is returned when the grown block
    /// pushes the central directory past what the EOCD can address.
    pub async fn write_entry<W>(&self, id: u32, value: &[u8], out: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let reader = self.reader.as_ref();
        let eocd = locate_eocd(reader).await?;
        let block = locate_signing_block(reader, eocd.central_directory_offset).await?;

        let mut builder = SigningBlockBuilder::new();
        for entry in entries(block.window())? {
            let entry = entry?;
            if entry.id != id {
                builder.push(entry.id, entry.value)?;
            }
        }
        builder.push(id, value)?;
        let new_block = builder.build();

        let new_cd_offset = block.offset() + new_block.len() as u64;
        let patched = u32::try_from(new_cd_offset)
            .ok()
            .filter(|&offset| offset != u32::MAX)
            .ok_or(ExtraInfoError::OffsetOverflow {
                offset: new_cd_offset,
            })?;

        debug!(
            block_offset = block.offset(),
            old_len = block.len(),
            new_len = new_block.len(),
            new_cd_offset,
            "rebuilt signing block"
        );

        let cd_offset_field = eocd.eocd_offset + EndOfCentralDirectory::CD_OFFSET_FIELD_OFFSET;

        let mut written = self.copy_range(0, block.offset(), out).await?;
        out.write_all(&new_block).await?;
        written += new_block.len() as u64;
        written += self
            .copy_range(eocd.central_directory_offset, cd_offset_field, out)
            .await?;
        out.write_all(&patched.to_le_bytes()).await?;
        written += 4;
        written += self
            .copy_range(cd_offset_field + 4, reader.size(), out)
            .await?;
        out.flush().await?;

        Ok(written)
    }

    /// Write the archive with `value` under `id` to the file at `path`.
    ///
    /// The copy is assembled in a temporary file next to `path` and only
    /// renamed into place once complete, so a failed write leaves nothing
    /// behind and an existing file at `path` is replaced atomically.
    ///
    /// # Errors
    ///
    /// Everything [`write_entry`](Self::write_entry) can return, I/O errors
    /// on the output, and [`ExtraInfoError::OutputIsSource`] when `path`
    /// resolves to the source set with
    /// [`with_source_path`](Self::with_source_path).
    pub async fn write_entry_to_path(&self, id: u32, value: &[u8], path: &Path) -> Result<u64> {
        if let Some(source) = &self.source_path {
            ensure_distinct(source, path).await?;
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let (file, temp_path) = NamedTempFile::new_in(dir)?.into_parts();
        let mut file = fs::File::from_std(file);

        let written = self.write_entry(id, value, &mut file).await?;
        file.sync_all().await?;
        drop(file);
        temp_path.persist(path).map_err(io::Error::from)?;

        info!(path = %path.display(), bytes = written, id = format_args!("{:#010x}", id), "wrote archive");
        Ok(written)
    }

    /// Write the archive with a distributor channel to `path`.
    pub async fn write_channel(&self, channel: &str, path: &Path) -> Result<u64> {
        self.write_entry_to_path(APK_CHANNEL_BLOCK_ID, channel.as_bytes(), path)
            .await
    }

    /// Write the archive to `path` with `value` stored under the id derived
    /// from `key`.
    pub async fn write_extra(&self, key: &str, value: &[u8], path: &Path) -> Result<u64> {
        self.write_entry_to_path(key_to_id(key)?, value, path).await
    }

    async fn copy_range<W>(&self, start: u64, end: u64, out: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        let mut pos = start;
        while pos < end {
            let n = ((end - pos) as usize).min(COPY_CHUNK_SIZE);
            self.reader.read_exact_at(pos, &mut buf[..n]).await?;
            out.write_all(&buf[..n]).await?;
            pos += n as u64;
        }
        Ok(end.saturating_sub(start))
    }
}

/// Refuse an output that resolves to the same file as the source.
async fn ensure_distinct(source: &Path, output: &Path) -> Result<()> {
    let output_real = match fs::canonicalize(output).await {
        Ok(path) => path,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if fs::canonicalize(source).await? == output_real {
        return Err(ExtraInfoError::OutputIsSource {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}
