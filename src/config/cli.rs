//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// audioprint - Batch acoustic fingerprint extraction
///
/// Processes a single audio file or all audio files in a directory and
/// extracts metadata plus numeric features (MFCC, spectral contrast, chroma,
/// tempo). Results are emitted as a JSON document.
#[derive(Parser, Debug)]
#[command(name = "audioprint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input path (file or directory)
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Output file for JSON results (prints to stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Disable the persistent feature cache (duplicates within one run are
    /// still computed only once)
    #[arg(long, default_value = "false")]
    pub no_cache: bool,

    /// Directory for the feature cache (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Pipeline build identifier used in cache keys (defaults to the crate
    /// version; bump it to invalidate prior cache entries)
    #[arg(long, value_name = "ID")]
    pub build_id: Option<String>,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress the progress bar)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["audioprint", "/music"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("/music"));
        assert!(cli.output.is_none());
        assert!(!cli.no_cache);
        assert!(cli.build_id.is_none());
    }

    #[test]
    fn parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "audioprint",
            "/music",
            "-o",
            "features.json",
            "--no-cache",
            "--cache-dir",
            "/tmp/fc",
            "--build-id",
            "v2",
            "-j",
            "4",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("features.json")));
        assert!(cli.no_cache);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/fc")));
        assert_eq!(cli.build_id.as_deref(), Some("v2"));
        assert_eq!(cli.threads, Some(4));
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
    }
}
