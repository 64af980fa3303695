//! # apkextra
//!
//! Read vendor metadata stored in the APK Signing Block of an Android package.
//!
//! APKs signed with signature scheme v2 carry an "APK Signing Block" between
//! the ZIP entries and the Central Directory. Besides the signature it can hold
//! arbitrary id/value pairs, which distributors use to stamp a channel name
//! into an already-signed package. This crate finds that block, validates it
//! and returns the raw bytes stored under a given id. It can also write a copy
//! of an APK with an extra entry injected, or one copy per channel of a
//! channel list.
//!
//! Archives are read through the [`ReadAt`] trait, so a local file, an
//! in-memory buffer or a remote file fetched with HTTP Range requests all work
//! the same way. Only the tail of the archive is ever read.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use apkextra::{ExtraInfoReader, HttpOptions, HttpRangeReader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = HttpRangeReader::new(
//!         "https://example.com/app.apk".to_string(),
//!         HttpOptions::default(),
//!     )
//!     .await?;
//!     let reader = ExtraInfoReader::new(Arc::new(source));
//!
//!     let eocd = reader.eocd().await?;
//!     match reader.get_channel_info(&eocd).await {
//!         Ok(channel) => println!("{}", String::from_utf8_lossy(&channel)),
//!         Err(e) if e.is_not_found() => println!("no channel"),
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod apk;
pub mod cli;
pub mod io;

pub use apk::{
    APK_CHANNEL_BLOCK_ID, APK_SIGNATURE_SCHEME_V2_BLOCK_ID, EocdDescriptor, ExtraInfoError,
    ExtraInfoReader, ExtraInfoWriter, key_to_id,
};
pub use cli::Cli;
pub use io::{HttpOptions, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
