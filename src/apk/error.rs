//! Error taxonomy for signing block extraction.
//!
//! Low-level reasons ([`WindowError`], [`BlockError`], [`EntryError`]) carry the
//! numbers that made a check fail. [`ExtraInfoError`] groups them into the
//! categories callers branch on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Bounds violations in [`ByteWindow`](super::ByteWindow) and its cursor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("read of {width} bytes at offset {offset} exceeds window length {len}")]
    OutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("invalid range {start}..{end} for window length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("insufficient data: wanted {wanted} bytes, {remaining} remaining")]
    InsufficientData { wanted: usize, remaining: usize },
}

/// Reasons the bytes before the central directory are not a signing block
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("APK too small for APK Signing Block, central directory offset: {cd_offset}")]
    TooSmall { cd_offset: u64 },

    #[error("no APK Signing Block magic before central directory")]
    MagicMismatch,

    #[error("APK Signing Block size out of range: {size}")]
    SizeOutOfRange { size: u64 },

    #[error("APK Signing Block offset out of range: {total_size} bytes before offset {cd_offset}")]
    OffsetOutOfRange { cd_offset: u64, total_size: u64 },

    #[error("APK Signing Block size in header and footer do not match: {header} vs {footer}")]
    SizeMismatch { header: u64, footer: u64 },

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Reasons an id/value entry could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("insufficient data to read size of APK Signing Block entry #{entry}: {remaining} bytes left")]
    Truncated { entry: usize, remaining: usize },

    #[error("APK Signing Block entry #{entry} size out of range: {len}, available: {available}")]
    LenOutOfRange {
        entry: usize,
        len: u64,
        available: usize,
    },

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Errors returned by the extraction and injection APIs
#[derive(Error, Debug)]
pub enum ExtraInfoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a ZIP archive: End of Central Directory record not found")]
    NotAZip,

    #[error("ZIP64 APK not supported")]
    Zip64NotSupported,

    #[error(
        "ZIP central directory at {cd_offset} (size {cd_size}) is not immediately followed by End of Central Directory at {eocd_offset}"
    )]
    StructuralMismatch {
        cd_offset: u64,
        cd_size: u64,
        eocd_offset: u64,
    },

    #[error("APK Signing Block not found: {0}")]
    SigningBlockNotFound(#[from] BlockError),

    #[error("malformed APK Signing Block entry: {0}")]
    EntryMalformed(#[from] EntryError),

    #[error("id {id:#010x} not found in APK Signing Block")]
    IdNotFound { id: u32 },

    #[error("invalid key: key must not be empty")]
    InvalidKey,

    #[error("v2 channel info not found")]
    ChannelNotFound(#[source] Box<ExtraInfoError>),

    #[error("v2 signing not found")]
    SignatureNotFound(#[source] Box<ExtraInfoError>),

    #[error("extra info not found for key {key:?}")]
    ExtraInfoNotFound {
        key: String,
        #[source]
        source: Box<ExtraInfoError>,
    },

    #[error("central directory offset {offset} does not fit in the EOCD record")]
    OffsetOverflow { offset: u64 },

    #[error("output {} is the source archive", path.display())]
    OutputIsSource { path: PathBuf },

    #[error("file name format {format:?} must contain exactly one %s")]
    InvalidNameFormat { format: String },

    #[error("channel {channel:?} cannot be used in a file name")]
    InvalidChannelName { channel: String },
}

impl ExtraInfoError {
    /// True when the archive is readable but the requested data is absent
    /// or unreadable inside the signing block.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExtraInfoError::SigningBlockNotFound(_)
                | ExtraInfoError::IdNotFound { .. }
                | ExtraInfoError::ChannelNotFound(_)
                | ExtraInfoError::SignatureNotFound(_)
                | ExtraInfoError::ExtraInfoNotFound { .. }
        )
    }

    /// Failures of the signing block itself, as opposed to the archive
    /// around it. These are the ones the facade re-labels per entry point.
    pub(crate) fn is_block_level(&self) -> bool {
        matches!(
            self,
            ExtraInfoError::SigningBlockNotFound(_)
                | ExtraInfoError::EntryMalformed(_)
                | ExtraInfoError::IdNotFound { .. }
        )
    }
}

pub type Result<T, E = ExtraInfoError> = std::result::Result<T, E>;
