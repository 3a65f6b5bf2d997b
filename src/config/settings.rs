//! Runtime configuration settings

use std::path::PathBuf;

/// Runtime settings for the extraction pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file or directory)
    pub input: PathBuf,
    /// Output file for the JSON document (stdout when None)
    pub output: Option<PathBuf>,
    /// Whether computed features are persisted across runs
    pub cache_enabled: bool,
    /// Backing directory for the persistent cache
    pub cache_dir: PathBuf,
    /// Build identifier folded into every cache key
    pub build_id: String,
    /// Number of worker threads
    pub threads: usize,
    /// Show the progress bar
    pub show_progress: bool,
    /// Print each record as it completes (stdout mode only)
    pub verbose: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        let default_threads = num_cpus::get().saturating_sub(1).max(1);

        Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            cache_enabled: !cli.no_cache,
            cache_dir: cli
                .cache_dir
                .clone()
                .unwrap_or_else(default_cache_dir),
            build_id: cli
                .build_id
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            threads: cli.threads.unwrap_or(default_threads),
            show_progress: !cli.quiet,
            verbose: cli.verbose > 0,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("audioprint_feature_cache")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: None,
            cache_enabled: true,
            cache_dir: default_cache_dir(),
            build_id: env!("CARGO_PKG_VERSION").to_string(),
            threads: num_cpus::get().saturating_sub(1).max(1),
            show_progress: true,
            verbose: false,
        }
    }
}
