//! progress-watcher - Live progress display for long-running commands
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use progress_watcher::backend::{ProcessSource, ProcessWorkload};
use progress_watcher::config::{CliArgs, RunConfig};
use progress_watcher::pipeline::{render_animation, PipelineConfig};
use progress_watcher::reporter::ReporterKind;
use progress_watcher::summary::{print_header, print_summary};
use progress_watcher::{ProgressError, ProgressRun};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose, args.graphical)?;

    let config = RunConfig::from_args(args)
        .map_err(ProgressError::from)
        .context("Invalid configuration")?;

    if config.reporter == ReporterKind::Text {
        print_header(&config);
    }

    let workload = ProcessWorkload::new(config.shell.clone(), config.progress_dir.clone());
    let source = ProcessSource::new(config.progress_dir.clone());
    let mut reporter = config
        .reporter
        .build()
        .map_err(ProgressError::from)
        .context("Failed to create progress reporter")?;

    let command = config.command.clone();
    let output_dir = config.output_dir.clone();
    let wants_animation = config.wants_animation();
    let pipeline = PipelineConfig::with_frame_delay(config.frame_delay);

    let outcome = ProgressRun::new(config, workload, source)
        .execute(&mut reporter, || {
            Confirm::new()
                .with_prompt(format!("Start '{}'?", command))
                .default(true)
                .interact()
                .map_err(io::Error::other)
        })
        .context("Run failed")?;

    // Keep the summary on screen even if the animation step fails below.
    let animation = if wants_animation {
        match render_animation(&outcome.snapshot_files, &output_dir, &pipeline) {
            Ok(path) => path,
            Err(e) => {
                print_summary(&outcome, None);
                return Err(e).context(format!(
                    "Post-processing failed, {} snapshot files kept in {}",
                    outcome.snapshot_files.len(),
                    output_dir.display()
                ));
            }
        }
    } else {
        None
    };

    print_summary(&outcome, animation.as_deref());

    if outcome.sampling_failures > 0 {
        info!(
            failures = outcome.sampling_failures,
            "Run completed with sampling failures"
        );
    }

    Ok(())
}

/// Initialize logging; the graphical reporter owns the screen, so only errors get through
fn setup_logging(verbose: bool, graphical: bool) -> Result<()> {
    let filter = if graphical {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("progress_watcher=debug,warn")
    } else {
        EnvFilter::new("progress_watcher=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
