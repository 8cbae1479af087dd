//! Text progress reporter
//!
//! Draws a fixed-width bar followed by the raw fraction on a single,
//! continuously refreshed terminal line using indicatif.

use super::{scaled_position, Reporter};
use crate::error::{ReporterError, ReporterResult};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Bar width in cells
pub const BAR_LENGTH: u64 = 120;

/// Text reporter writing to stdout
pub struct TextReporter {
    /// Progress bar, present between `start` and `stop`
    bar: Option<ProgressBar>,

    /// Draw nothing (for tests and non-terminal output)
    hidden: bool,
}

impl TextReporter {
    /// Create a reporter drawing to stdout
    pub fn new() -> Self {
        Self {
            bar: None,
            hidden: false,
        }
    }

    /// Create a reporter that tracks progress without drawing
    pub fn hidden() -> Self {
        Self {
            bar: None,
            hidden: true,
        }
    }

    /// Current bar position in cells
    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(ProgressBar::position)
    }

    fn draw_target(&self) -> ProgressDrawTarget {
        if self.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout()
        }
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TextReporter {
    fn start(&mut self, _description: &str) -> ReporterResult<()> {
        let bar = ProgressBar::with_draw_target(Some(BAR_LENGTH), self.draw_target());
        bar.set_style(
            ProgressStyle::default_bar()
                .template(&format!("[{{bar:{}}}] {{msg}}", BAR_LENGTH))?
                .progress_chars("# "),
        );
        bar.set_message(format_fraction(0.0));

        self.bar = Some(bar);
        Ok(())
    }

    fn on_progress(&mut self, fraction: f64) -> ReporterResult<()> {
        let bar = self.bar.as_ref().ok_or(ReporterError::NotStarted)?;
        bar.set_position(scaled_position(fraction, BAR_LENGTH));
        bar.set_message(format_fraction(fraction));
        Ok(())
    }

    fn stop(&mut self) -> ReporterResult<()> {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        Ok(())
    }
}

/// Fraction as shown next to the bar
pub fn format_fraction(fraction: f64) -> String {
    format!("{:.5}", fraction)
}
