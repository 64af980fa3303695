//! Generating one APK per distribution channel.
//!
//! A channel list is a text file with one channel per line. Lines starting
//! with `#` are comments and blank lines are ignored. Every channel is written
//! to `<target dir>/<format with %s replaced by the channel>` and read back to
//! check the channel entry landed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info};

use crate::io::{LocalFileReader, ReadAt};

use super::error::{ExtraInfoError, Result};
use super::reader::ExtraInfoReader;
use super::structures::{APK_CHANNEL_BLOCK_ID, APK_SIGNATURE_SCHEME_V2_BLOCK_ID};
use super::writer::ExtraInfoWriter;

/// File name used when no format is given
pub const DEFAULT_NAME_FORMAT: &str = "app-%s.apk";

const PLACEHOLDER: &str = "%s";

/// Channels listed in `text`, in order.
pub fn parse_channel_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn read_channel_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).await?;
    Ok(parse_channel_list(&text))
}

/// File name for `channel` under `format`, which must hold exactly one `%s`.
///
/// # Errors
///
/// [`ExtraInfoError::InvalidNameFormat`] for a format without exactly one
/// placeholder, [`ExtraInfoError::InvalidChannelName`] for a channel that
/// would escape the target directory.
pub fn output_file_name(format: &str, channel: &str) -> Result<String> {
    if format.matches(PLACEHOLDER).count() != 1 {
        return Err(ExtraInfoError::InvalidNameFormat {
            format: format.to_string(),
        });
    }
    if channel.is_empty() || channel == "." || channel == ".." || channel.contains(['/', '\\']) {
        return Err(ExtraInfoError::InvalidChannelName {
            channel: channel.to_string(),
        });
    }
    Ok(format.replacen(PLACEHOLDER, channel, 1))
}

/// Outcome for one channel of a batch.
#[derive(Debug)]
pub struct GeneratedApk {
    pub channel: String,
    pub path: PathBuf,
    /// Bytes written, or why the APK is missing or unusable
    pub result: Result<u64>,
}

impl GeneratedApk {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Write one APK per channel into `target_dir`.
///
/// A failure for one channel is recorded in its [`GeneratedApk`] and the batch
/// moves on to the next.
///
/// # Errors
///
/// The whole batch is refused, before any file is written, when a file name
/// cannot be built, `target_dir` is not a directory, or the source carries no
/// APK Signature Scheme v2 block ([`ExtraInfoError::SignatureNotFound`]).
pub async fn generate_channel_apks<R: ReadAt + ?Sized>(
    writer: &ExtraInfoWriter<R>,
    channels: &[String],
    format: &str,
    target_dir: &Path,
) -> Result<Vec<GeneratedApk>> {
    let names = channels
        .iter()
        .map(|channel| output_file_name(format, channel))
        .collect::<Result<Vec<_>>>()?;

    if !fs::metadata(target_dir).await?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", target_dir.display()),
        )
        .into());
    }

    let source = ExtraInfoReader::new(writer.source().clone());
    let eocd = source.eocd().await?;
    if !source.has_v2_signature(&eocd).await? {
        return Err(ExtraInfoError::SignatureNotFound(Box::new(
            ExtraInfoError::IdNotFound {
                id: APK_SIGNATURE_SCHEME_V2_BLOCK_ID,
            },
        )));
    }

    let mut generated = Vec::with_capacity(channels.len());
    for (channel, name) in channels.iter().zip(names) {
        let path = target_dir.join(name);
        let result = write_and_verify(writer, channel, &path).await;

        match &result {
            Ok(bytes) => info!(channel = %channel, path = %path.display(), bytes, "generated channel apk"),
            Err(e) => error!(channel = %channel, path = %path.display(), error = %e, "failed to generate channel apk"),
        }
        generated.push(GeneratedApk {
            channel: channel.clone(),
            path,
            result,
        });
    }
    Ok(generated)
}

async fn write_and_verify<R: ReadAt + ?Sized>(
    writer: &ExtraInfoWriter<R>,
    channel: &str,
    path: &Path,
) -> Result<u64> {
    let written = writer.write_channel(channel, path).await?;

    let output = ExtraInfoReader::new(Arc::new(LocalFileReader::new(path)?));
    let eocd = output.eocd().await?;
    if !output.has_extra_info(&eocd, APK_CHANNEL_BLOCK_ID).await? {
        return Err(ExtraInfoError::ChannelNotFound(Box::new(
            ExtraInfoError::IdNotFound {
                id: APK_CHANNEL_BLOCK_ID,
            },
        )));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_list_skips_comments_and_blanks() {
        let text = "# store builds\nofficial\n\n  huawei  \n#oppo\nxiaomi\r\n";
        assert_eq!(
            parse_channel_list(text),
            vec!["official", "huawei", "xiaomi"]
        );
        assert!(parse_channel_list("# nothing\n\n").is_empty());
    }

    #[test]
    fn file_names_from_format() {
        assert_eq!(
            output_file_name(DEFAULT_NAME_FORMAT, "official").unwrap(),
            "app-official.apk"
        );
        assert_eq!(
            output_file_name("%s.apk", "v2-beta").unwrap(),
            "v2-beta.apk"
        );
        assert!(matches!(
            output_file_name("app.apk", "official"),
            Err(ExtraInfoError::InvalidNameFormat { .. })
        ));
        assert!(matches!(
            output_file_name("%s-%s.apk", "official"),
            Err(ExtraInfoError::InvalidNameFormat { .. })
        ));
    }

    #[test]
    fn channels_cannot_leave_target_dir() {
        for channel in ["../evil", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(
                    output_file_name(DEFAULT_NAME_FORMAT, channel),
                    Err(ExtraInfoError::InvalidChannelName { .. })
                ),
                "{:?} accepted",
                channel
            );
        }
    }
}
