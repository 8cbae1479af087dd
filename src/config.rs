//! Configuration types for progress-watcher
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::reporter::ReporterKind;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Default sampling interval in seconds
pub const DEFAULT_INTERVAL_SECS: f64 = 0.5;

/// Sampling interval limits in seconds
const MIN_INTERVAL_SECS: f64 = 0.001;
const MAX_INTERVAL_SECS: f64 = 3600.0;

/// Default animation delay per frame, in hundredths of a second
pub const DEFAULT_FRAME_DELAY: u32 = 20;

/// Run a command and watch its progress
#[derive(Parser, Debug, Clone)]
#[command(
    name = "progress-watcher",
    version,
    about = "Run a command and monitor its progress",
    long_about = "Runs a command while an independent monitor samples its progress at a fixed \
                  interval and streams it to a progress bar.\n\n\
                  The command reports progress by appending lines to the file named by \
                  $PROGRESS_FILE: either a bare fraction (0.42) or a JSON record \
                  {\"fraction\": 0.42, \"snapshot\": \"digraph ...\"}.",
    after_help = "EXAMPLES:\n    \
        progress-watcher -c 'for i in 1 2 3 4; do echo 0.$((i*25)) >> \"$PROGRESS_FILE\"; sleep 1; done'\n    \
        progress-watcher -c ./long-job.sh -i 0.2 -g\n    \
        progress-watcher -c ./long-job.sh --dot -o frames/  # GraphViz snapshots + snapshot.gif\n    \
        progress-watcher -c ./long-job.sh -W  # wait for confirmation before starting"
)]
pub struct CliArgs {
    /// The command to run
    #[arg(short = 'c', long, value_name = "COMMAND")]
    pub command: String,

    /// Show a graphical progress bar
    #[arg(short = 'g', long)]
    pub graphical: bool,

    /// Produce a series of GraphViz snapshots
    #[arg(short = 'd', long = "dot", visible_alias = "snapshots")]
    pub capture_snapshots: bool,

    /// Seconds between progress samples
    #[arg(
        short = 'i',
        long,
        default_value_t = DEFAULT_INTERVAL_SECS,
        allow_negative_numbers = true,
        value_name = "SECS"
    )]
    pub interval: f64,

    /// Output directory for snapshots
    #[arg(short = 'o', long, default_value = ".", value_name = "DIR")]
    pub output: PathBuf,

    /// Wait for confirmation before starting (e.g. to attach a debugger)
    #[arg(short = 'W', long)]
    pub wait: bool,

    /// Shell used to run the command
    #[arg(long, default_value = "sh", value_name = "PROGRAM")]
    pub shell: String,

    /// Directory holding per-run progress files (defaults to the temp dir)
    #[arg(long, value_name = "DIR")]
    pub progress_dir: Option<PathBuf>,

    /// Keep snapshot files but skip the animation pipeline
    #[arg(long)]
    pub no_animation: bool,

    /// Animation delay per frame in hundredths of a second
    #[arg(long, default_value_t = DEFAULT_FRAME_DELAY, value_name = "CENTISECS")]
    pub frame_delay: u32,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Workload command
    pub command: String,

    /// Reporter variant
    pub reporter: ReporterKind,

    /// Capture and persist snapshots
    pub capture_snapshots: bool,

    /// Time between samples
    pub interval: Duration,

    /// Where snapshot files and the animation are written
    pub output_dir: PathBuf,

    /// Hold the start gate until confirmed
    pub interactive_start: bool,

    /// Shell running the command
    pub shell: String,

    /// Directory holding per-run progress files
    pub progress_dir: PathBuf,

    /// Run the animation pipeline after capture
    pub render_animation: bool,

    /// Animation delay per frame in hundredths of a second
    pub frame_delay: u32,

    /// Debug logging
    pub verbose: bool,
}

impl RunConfig {
    /// Configuration with defaults for the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reporter: ReporterKind::Text,
            capture_snapshots: false,
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            output_dir: PathBuf::from("."),
            interactive_start: false,
            shell: "sh".to_string(),
            progress_dir: std::env::temp_dir(),
            render_animation: true,
            frame_delay: DEFAULT_FRAME_DELAY,
            verbose: false,
        }
    }

    /// Create validated config from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }

        let interval = validate_interval(args.interval)?;

        if args.frame_delay == 0 {
            return Err(ConfigError::InvalidFrameDelay(args.frame_delay));
        }

        if args.output.exists() && !args.output.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output,
                reason: "not a directory".into(),
            });
        }

        let reporter = if args.graphical {
            if !ReporterKind::Graphical.is_available() {
                return Err(ConfigError::GraphicalUnavailable);
            }
            ReporterKind::Graphical
        } else {
            ReporterKind::Text
        };

        Ok(Self {
            command: args.command,
            reporter,
            capture_snapshots: args.capture_snapshots,
            interval,
            output_dir: args.output,
            interactive_start: args.wait,
            shell: args.shell,
            progress_dir: args.progress_dir.unwrap_or_else(std::env::temp_dir),
            render_animation: !args.no_animation,
            frame_delay: args.frame_delay,
            verbose: args.verbose,
        })
    }

    /// Whether the animation pipeline should run after the run
    pub fn wants_animation(&self) -> bool {
        self.capture_snapshots && self.render_animation
    }
}

fn validate_interval(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) {
        return Err(ConfigError::InvalidInterval {
            value: secs,
            min: MIN_INTERVAL_SECS,
            max: MAX_INTERVAL_SECS,
        });
    }
    Ok(Duration::from_secs_f64(secs))
}
