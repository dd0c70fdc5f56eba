use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "dvbio")]
#[clap(about = "dvbio tunes Linux DVB-T adapters and reads their transport stream.", long_about = None)]
#[clap(version)]
pub(crate) struct Cli {
    /// Configuration file.{n}
    /// Defaults to `dvbio.toml` in the current directory, if present.
    #[clap(short = 'f', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Output format for device listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// The raw tab-separated device list
    Tsv,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// List DVB adapters.{n}
    /// Every adapter under the device root is probed in order
    /// until one cannot be opened.
    #[clap(name = "list")]
    List {
        #[clap(value_enum, long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Signal test.{n}
    /// This subcommand tunes the adapter and repeatedly prints
    /// signal presence, lock, strength and quality.
    #[clap(name = "checksignal")]
    Checksignal {
        /// The center frequency in Hz.
        #[clap(long)]
        frequency: Option<u64>,

        /// The adapter directory, e.g. `/dev/dvb/adapter1`.{n}
        /// If omitted, the first DVB-T adapter is used.
        #[clap(short, long, value_name = "PATH")]
        adapter: Option<PathBuf>,

        /// Milliseconds between two reports.
        #[clap(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Number of reports. 0 means until interrupted.
        #[clap(short = 'n', long, default_value_t = 0)]
        count: u64,
    },

    /// Record the transport stream.{n}
    /// This subcommand tunes the adapter and copies the stream
    /// to the output until the byte limit is reached or
    /// the user stops it with Ctrl-C.
    #[clap(name = "dump")]
    Dump {
        /// The center frequency in Hz.
        #[clap(long)]
        frequency: Option<u64>,

        /// The adapter directory, e.g. `/dev/dvb/adapter1`.{n}
        /// If omitted, the first DVB-T adapter is used.
        #[clap(short, long, value_name = "PATH")]
        adapter: Option<PathBuf>,

        /// Stop after this many bytes.
        #[clap(short, long)]
        bytes: Option<u64>,

        /// Milliseconds to wait after tuning before reporting
        /// how many bytes are already buffered.
        #[clap(long, default_value_t = 0)]
        wait_ms: u64,

        /// The location of the output.{n}
        /// If '-' is specified, the stream is written to stdout.
        #[clap(required = true)]
        output: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dump() {
        let cli = Cli::try_parse_from([
            "dvbio",
            "-v",
            "dump",
            "--frequency",
            "610000000",
            "--bytes",
            "1880",
            "-",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Dump {
                frequency,
                bytes,
                output,
                adapter,
                ..
            } => {
                assert_eq!(frequency, Some(610_000_000));
                assert_eq!(bytes, Some(1880));
                assert_eq!(output, "-");
                assert!(adapter.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_format() {
        let cli = Cli::try_parse_from(["dvbio", "list", "--format", "tsv"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                format: OutputFormat::Tsv
            }
        ));
    }
}
