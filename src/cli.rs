use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::apk::DEFAULT_NAME_FORMAT;
use crate::io::HttpOptions;

#[derive(Parser, Debug)]
#[command(name = "apkextra")]
#[command(version)]
#[command(about = "Read and write vendor metadata in the APK Signing Block", long_about = None)]
#[command(after_help = "Examples:\n  \
  apkextra channel app.apk                          print the distribution channel\n  \
  apkextra get app.apk flavor                       print the value stored under key \"flavor\"\n  \
  apkextra --hex signature https://example.com/app.apk   dump the v2 signature over HTTP\n  \
  apkextra write-channel app.apk official -o app-official.apk\n  \
  apkextra write-channels app.apk --channels channels.txt --target-dir out")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print values as hex instead of text
    #[arg(long, global = true)]
    pub hex: bool,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30, global = true)]
    pub timeout: u64,

    /// HTTP retries on timeouts and connection errors
    #[arg(long, value_name = "N", default_value_t = 10, global = true)]
    pub retries: u32,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// No log output
    #[arg(short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the distribution channel
    Channel(Source),

    /// Print the APK Signature Scheme v2 payload
    Signature(Source),

    /// Print the value stored under a text key (first four bytes are significant)
    Get {
        #[command(flatten)]
        source: Source,
        /// Text key
        key: String,
    },

    /// Print the value stored under a numeric id (decimal or 0x-prefixed hex)
    GetId {
        #[command(flatten)]
        source: Source,
        /// Entry id
        #[arg(value_parser = parse_id)]
        id: u32,
    },

    /// List every entry in the signing block
    List(Source),

    /// Copy a local APK, adding or replacing its distribution channel
    WriteChannel {
        #[command(flatten)]
        source: Source,
        /// Channel name
        channel: String,
        /// Output file
        #[arg(short = 'o', value_name = "OUT")]
        output: PathBuf,
    },

    /// Copy a local APK, adding or replacing the value under a text key
    WriteExtra {
        #[command(flatten)]
        source: Source,
        /// Text key
        key: String,
        /// Value to store
        value: String,
        /// Output file
        #[arg(short = 'o', value_name = "OUT")]
        output: PathBuf,
    },

    /// Write one copy of a local APK per channel listed in a file
    WriteChannels {
        #[command(flatten)]
        source: Source,
        /// Channel list, one per line, `#` starts a comment
        #[arg(long, value_name = "FILE")]
        channels: PathBuf,
        /// Output file name, `%s` is replaced by the channel
        #[arg(long, value_name = "FORMAT", default_value = DEFAULT_NAME_FORMAT)]
        format: String,
        /// Directory for the generated APKs [default: current directory]
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct Source {
    /// APK file path or HTTP URL
    #[arg(value_name = "APK")]
    pub file: String,
}

impl Source {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }
}

impl Command {
    pub fn source(&self) -> &Source {
        match self {
            Command::Channel(source) | Command::Signature(source) | Command::List(source) => {
                source
            }
            Command::Get { source, .. }
            | Command::GetId { source, .. }
            | Command::WriteChannel { source, .. }
            | Command::WriteExtra { source, .. }
            | Command::WriteChannels { source, .. } => source,
        }
    }

    /// Whether the command produces new archives
    pub fn writes(&self) -> bool {
        matches!(
            self,
            Command::WriteChannel { .. } | Command::WriteExtra { .. } | Command::WriteChannels { .. }
        )
    }
}

impl Cli {
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout),
            max_retry: self.retries,
        }
    }

    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.quiet {
            return None;
        }
        Some(match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        })
    }
}

/// Parse an entry id given as decimal or `0x`-prefixed hex.
pub fn parse_id(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid id {:?}: {}", s, e))
}
