//! Progress reporters
//!
//! A reporter renders the ordered progress stream. Variants only change how
//! things are drawn; the control protocol is the same for all of them:
//! `start` once, `on_progress` per sample in order, `idle` whenever the
//! stream was quiet for a while, `stop` once after end of stream.

#[cfg(feature = "tui")]
pub mod graphical;
pub mod text;

#[cfg(feature = "tui")]
pub use graphical::GraphicalReporter;
pub use text::TextReporter;

#[cfg(not(feature = "tui"))]
use crate::error::ReporterError;
use crate::error::ReporterResult;
use std::fmt;

/// Consumer of a progress stream
pub trait Reporter {
    /// One-time setup before the first sample
    fn start(&mut self, description: &str) -> ReporterResult<()>;

    /// Render one progress fraction
    fn on_progress(&mut self, fraction: f64) -> ReporterResult<()>;

    /// Called when no sample arrived for a while; event-loop backed
    /// reporters pump their events here
    fn idle(&mut self) -> ReporterResult<()> {
        Ok(())
    }

    /// Tear down the display after end of stream
    fn stop(&mut self) -> ReporterResult<()>;
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn start(&mut self, description: &str) -> ReporterResult<()> {
        (**self).start(description)
    }

    fn on_progress(&mut self, fraction: f64) -> ReporterResult<()> {
        (**self).on_progress(fraction)
    }

    fn idle(&mut self) -> ReporterResult<()> {
        (**self).idle()
    }

    fn stop(&mut self) -> ReporterResult<()> {
        (**self).stop()
    }
}

/// Reporter variant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    /// Fixed-width bar on a refreshing terminal line
    Text,
    /// Full-screen gauge window
    Graphical,
}

impl ReporterKind {
    /// Check if this variant was compiled in
    pub fn is_available(self) -> bool {
        match self {
            ReporterKind::Text => true,
            ReporterKind::Graphical => cfg!(feature = "tui"),
        }
    }

    /// Build a reporter of this kind
    ///
    /// Fails with `Unavailable` for a variant that was not compiled in.
    pub fn build(self) -> ReporterResult<Box<dyn Reporter>> {
        match self {
            ReporterKind::Text => Ok(Box::new(TextReporter::new())),
            #[cfg(feature = "tui")]
            ReporterKind::Graphical => Ok(Box::new(GraphicalReporter::new())),
            #[cfg(not(feature = "tui"))]
            ReporterKind::Graphical => Err(ReporterError::Unavailable(self)),
        }
    }
}

impl fmt::Display for ReporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReporterKind::Text => f.write_str("text"),
            ReporterKind::Graphical => f.write_str("graphical"),
        }
    }
}

/// Scale a fraction to a display resolution
///
/// Out-of-range fractions are clamped to `[0, resolution]`; NaN shows as 0.
pub fn scaled_position(fraction: f64, resolution: u64) -> u64 {
    let scaled = (fraction * resolution as f64).floor();
    if scaled.is_nan() {
        0
    } else {
        scaled.clamp(0.0, resolution as f64) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_position() {
        assert_eq!(scaled_position(0.0, 120), 0);
        assert_eq!(scaled_position(0.5, 120), 60);
        assert_eq!(scaled_position(0.999, 120), 119);
        assert_eq!(scaled_position(1.0, 120), 120);
        assert_eq!(scaled_position(0.123456, 100_000), 12_345);
    }

    #[test]
    fn test_scaled_position_clamps() {
        assert_eq!(scaled_position(1.7, 120), 120);
        assert_eq!(scaled_position(-0.2, 120), 0);
        assert_eq!(scaled_position(f64::NAN, 120), 0);
        assert_eq!(scaled_position(f64::INFINITY, 120), 120);
    }

    #[test]
    fn test_text_is_always_available() {
        assert!(ReporterKind::Text.is_available());
        assert_eq!(ReporterKind::Text.to_string(), "text");
        assert!(ReporterKind::Text.build().is_ok());
    }

    #[test]
    fn test_graphical_builds_only_when_compiled_in() {
        let built = ReporterKind::Graphical.build();
        assert_eq!(built.is_ok(), ReporterKind::Graphical.is_available());

        #[cfg(not(feature = "tui"))]
        assert!(matches!(
            built,
            Err(crate::error::ReporterError::Unavailable(ReporterKind::Graphical))
        ));
    }
}
