//! audioprint CLI entry point

use audioprint::config::{Cli, Settings};
use audioprint::pipeline;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    // Build settings from CLI
    let settings = Settings::from_cli(&cli);

    // Validate inputs
    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    // Run the pipeline
    match pipeline::run(&settings) {
        Ok(summary) => {
            eprintln!();
            eprintln!(
                "Summary: {} successful, {} failed, {} cache hits (of {} total)",
                summary.successful, summary.failed, summary.cache_hits, summary.total_files
            );

            // Per-file failures are reflected in the output document, not
            // the exit status; only fatal conditions fail the run.
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = if cli.quiet { "error" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    // Check input exists
    if !cli.input.exists() {
        return Err(format!(
            "Input path does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Examples:\n    audioprint ~/Music -o features.json\n    audioprint ./track.mp3",
            cli.input.display()
        ));
    }

    // Check output parent directory exists (the file itself is created)
    if let Some(output) = &cli.output {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(format!(
                    "Output directory does not exist: {}\n\n  Tip: Create it first, e.g. mkdir -p {}",
                    parent.display(),
                    parent.display()
                ));
            }
        }
    }

    Ok(())
}
