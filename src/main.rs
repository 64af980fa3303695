//! Main entry point for the apkextra CLI application.
//!
//! Reads or writes vendor metadata in the APK Signing Block of a local APK
//! or, for reading, of a remote APK fetched with HTTP Range requests.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

use apkextra::apk::{entries, generate_channel_apks, read_channel_list};
use apkextra::cli::{Cli, Command};
use apkextra::{
    APK_CHANNEL_BLOCK_ID, APK_SIGNATURE_SCHEME_V2_BLOCK_ID, EocdDescriptor, ExtraInfoError,
    ExtraInfoReader, ExtraInfoWriter, HttpRangeReader, LocalFileReader, ReadAt,
};

/// Exit status when the archive is fine but the requested value is absent
const EXIT_NOT_FOUND: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(level) = cli.log_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    match run(&cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<ExtraInfoError>() {
            Some(inner) if inner.is_not_found() => {
                eprintln!("{:#}", e);
                Ok(ExitCode::from(EXIT_NOT_FOUND))
            }
            _ => Err(e),
        },
    }
}

/// Open the source named on the command line and dispatch.
async fn run(cli: &Cli) -> Result<()> {
    let source = cli.command.source();

    if source.is_http_url() {
        if cli.command.writes() {
            bail!("writing requires a local APK, got URL {}", source.file);
        }

        let reader = HttpRangeReader::new(source.file.clone(), cli.http_options())
            .await
            .with_context(|| format!("cannot open {}", source.file))?;
        let reader = Arc::new(reader);

        let result = process_apk(reader.clone(), cli).await;
        info!(
            transferred = reader.transferred_bytes(),
            "total bytes transferred"
        );
        result
    } else {
        let reader = LocalFileReader::new(Path::new(&source.file))
            .with_context(|| format!("cannot open {}", source.file))?;
        process_apk(Arc::new(reader), cli).await
    }
}

/// Run one subcommand against an opened archive.
async fn process_apk<R: ReadAt + 'static>(source: Arc<R>, cli: &Cli) -> Result<()> {
    let file = &cli.command.source().file;
    let reader = ExtraInfoReader::new(source.clone());

    let value = match &cli.command {
        Command::WriteChannel {
            channel, output, ..
        } => {
            writer_for(source, file)
                .write_channel(channel, output)
                .await
                .with_context(|| format!("cannot write {}", output.display()))?;
            return Ok(());
        }
        Command::WriteExtra {
            key, value, output, ..
        } => {
            writer_for(source, file)
                .write_extra(key, value.as_bytes(), output)
                .await
                .with_context(|| format!("cannot write {}", output.display()))?;
            return Ok(());
        }
        Command::WriteChannels {
            channels,
            format,
            target_dir,
            ..
        } => {
            let target_dir = target_dir.as_deref().unwrap_or(Path::new("."));
            return write_channels(&writer_for(source, file), channels, format, target_dir).await;
        }
        Command::List(_) => return list_entries(&reader, file, cli.hex).await,
        Command::Channel(_) => reader.get_channel_info(&layout(&reader, file).await?).await?,
        Command::Signature(_) => {
            reader
                .get_signature_info(&layout(&reader, file).await?)
                .await?
        }
        Command::Get { key, .. } => {
            reader
                .get_extra_info(&layout(&reader, file).await?, key)
                .await?
        }
        Command::GetId { id, .. } => {
            reader
                .get_extra_info_by_id(&layout(&reader, file).await?, *id)
                .await?
        }
    };

    println!("{}", render(&value, cli.hex));
    Ok(())
}

/// Locate the central directory, naming the file on failure.
async fn layout<R: ReadAt + 'static>(
    reader: &ExtraInfoReader<R>,
    file: &str,
) -> Result<EocdDescriptor> {
    let eocd = reader
        .eocd()
        .await
        .with_context(|| format!("cannot read ZIP structure of {}", file))?;
    debug!(?eocd, "archive layout");
    Ok(eocd)
}

fn writer_for<R: ReadAt + 'static>(source: Arc<R>, file: &str) -> ExtraInfoWriter<R> {
    ExtraInfoWriter::new(source).with_source_path(file)
}

/// Generate one APK per channel in `channels_file`, failing if any of them
/// could not be written or verified.
async fn write_channels<R: ReadAt + 'static>(
    writer: &ExtraInfoWriter<R>,
    channels_file: &Path,
    format: &str,
    target_dir: &Path,
) -> Result<()> {
    let channels = read_channel_list(channels_file)
        .await
        .with_context(|| format!("cannot read channel list {}", channels_file.display()))?;
    if channels.is_empty() {
        bail!("no channels listed in {}", channels_file.display());
    }

    let generated = generate_channel_apks(writer, &channels, format, target_dir).await?;
    let failed = generated.iter().filter(|apk| !apk.is_success()).count();

    for apk in &generated {
        let status = if apk.is_success() { "ok" } else { "FAILED" };
        println!("{:<8}  {:<20}  {}", status, apk.channel, apk.path.display());
    }

    if failed > 0 {
        bail!("{} of {} channel APKs failed", failed, generated.len());
    }
    Ok(())
}

/// Print every entry of the signing block as a table.
async fn list_entries<R: ReadAt + 'static>(
    reader: &ExtraInfoReader<R>,
    file: &str,
    hex: bool,
) -> Result<()> {
    let eocd = layout(reader, file).await?;
    let block = reader.signing_block(&eocd).await?;

    println!("{:>10}  {:>10}  Value", "Id", "Length");
    println!("{}", "-".repeat(60));

    let mut count = 0usize;
    for entry in entries(block.window()).map_err(ExtraInfoError::from)? {
        let entry = entry.map_err(ExtraInfoError::from)?;
        println!(
            "{:#010x}  {:>10}  {}",
            entry.id,
            entry.value.len(),
            describe(entry.id, entry.value, hex)
        );
        count += 1;
    }

    println!("{}", "-".repeat(60));
    println!("{} entries, block at offset {}", count, block.offset());
    Ok(())
}

/// Format a payload for the terminal.
fn render(value: &[u8], hex: bool) -> String {
    if hex {
        hex::encode(value)
    } else {
        String::from_utf8_lossy(value).into_owned()
    }
}

/// One-line summary of an entry for `list`.
fn describe(id: u32, value: &[u8], hex: bool) -> String {
    const PREVIEW: usize = 24;

    let label = match id {
        APK_SIGNATURE_SCHEME_V2_BLOCK_ID => Some("[v2 signature]"),
        APK_CHANNEL_BLOCK_ID => Some("[channel]"),
        _ => None,
    };
    let shown = &value[..value.len().min(PREVIEW)];
    let ellipsis = if value.len() > PREVIEW { "..." } else { "" };

    match label {
        Some(label) if id == APK_SIGNATURE_SCHEME_V2_BLOCK_ID && !hex => label.to_string(),
        Some(label) => format!("{} {}{}", label, render(shown, hex), ellipsis),
        None => format!("{}{}", render(shown, hex), ellipsis),
    }
}
