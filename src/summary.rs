//! Console header and run summary

use crate::config::RunConfig;
use crate::coordinator::{RunOutcome, StopReason};
use console::style;
use humansize::{format_size, BINARY};
use std::path::Path;

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header before the run starts
pub fn print_header(config: &RunConfig) {
    println!();
    println!(
        "{} {}",
        style("progress-watcher").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Command:").bold(), config.command);
    println!(
        "  {} {:.3}s",
        style("Interval:").bold(),
        config.interval.as_secs_f64()
    );
    println!("  {} {}", style("Reporter:").bold(), config.reporter);
    if config.capture_snapshots {
        println!(
            "  {} {}",
            style("Snapshots:").bold(),
            config.output_dir.display()
        );
    }
    println!();
}

/// Print a summary of a finished run
pub fn print_summary(outcome: &RunOutcome, animation: Option<&Path>) {
    let elapsed_secs = outcome.elapsed.as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        outcome.samples_delivered as f64 / elapsed_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Run Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Run:").bold(), outcome.identifier);
    println!(
        "  {} {}",
        style("Started:").bold(),
        outcome.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {} {:.1}s (workload {:.1}s)",
        style("Duration:").bold(),
        elapsed_secs,
        outcome.workload_elapsed.as_secs_f64()
    );
    println!(
        "  {} {} ({:.1} samples/sec)",
        style("Samples:").bold(),
        format_number(outcome.samples_delivered),
        rate
    );
    if let Some(fraction) = outcome.last_fraction {
        println!("  {} {:.5}", style("Last fraction:").bold(), fraction);
    }
    if outcome.sampling_failures > 0 {
        println!(
            "  {} {}",
            style("Sampling failures:").yellow().bold(),
            format_number(outcome.sampling_failures)
        );
    }
    if outcome.stop_reason == StopReason::WorkerVanished {
        println!(
            "  {} worker exited without signalling completion",
            style("Warning:").yellow().bold()
        );
    }
    if !outcome.snapshot_files.is_empty() {
        println!(
            "  {} {} ({})",
            style("Snapshots:").bold(),
            format_number(outcome.snapshot_files.len() as u64),
            format_size(outcome.snapshot_bytes, BINARY)
        );
    }
    if let Some(path) = animation {
        println!("  {} {}", style("Animation:").bold(), path.display());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
