//! APK Signing Block parsing and editing.
//!
//! An APK signed with scheme v2 or later is a ZIP archive with an extra
//! container, the APK Signing Block, placed between the last ZIP entry and the
//! Central Directory. The block is a list of length-prefixed id/value pairs;
//! besides the signature it can carry vendor metadata such as a distribution
//! channel.
//!
//! ## Architecture
//!
//! - [`window`]: bounds-checked little-endian views over byte buffers
//! - [`key`]: mapping of short text keys to entry ids
//! - [`eocd`]: locating the End of Central Directory and the central directory
//! - [`locator`]: finding and validating the signing block
//! - [`scanner`]: walking the id/value entries of a block
//! - [`ExtraInfoReader`] / [`ExtraInfoWriter`]: the user-facing API
//! - [`channels`]: one APK per line of a channel list
//!
//! ## Limitations
//!
//! - ZIP64 archives are rejected
//! - Signatures are not verified and payloads are returned as raw bytes

pub mod channels;
pub mod eocd;
mod error;
pub mod key;
pub mod locator;
mod reader;
pub mod scanner;
mod structures;
pub mod window;
mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use channels::{
    DEFAULT_NAME_FORMAT, GeneratedApk, generate_channel_apks, output_file_name,
    parse_channel_list, read_channel_list,
};
pub use eocd::{EocdDescriptor, find_eocd, is_zip64_locator_present, locate_eocd};
pub use error::{BlockError, EntryError, ExtraInfoError, Result, WindowError};
pub use key::key_to_id;
pub use locator::{SigningBlock, locate_signing_block};
pub use reader::ExtraInfoReader;
pub use scanner::{Entries, Entry, entries, find_entry};
pub use structures::*;
pub use window::{ByteWindow, WindowCursor};
pub use writer::{ExtraInfoWriter, SigningBlockBuilder, encode_entry};
