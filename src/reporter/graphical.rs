//! Graphical progress reporter
//!
//! Takes over the terminal with an alternate screen and shows the command,
//! a high-resolution gauge and the raw fraction. The crossterm event queue
//! is pumped between samples so the window keeps up with resizes while the
//! caller drains the progress stream.

use super::{scaled_position, Reporter};
use crate::error::{ReporterError, ReporterResult};
use crate::reporter::text::format_fraction;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{stdout, Stdout};
use std::time::Duration;

/// Gauge resolution in steps
pub const GAUGE_RESOLUTION: u64 = 100_000;

/// What the window shows
#[derive(Debug, Clone, Default)]
pub struct GaugeView {
    /// Description of the watched work (the command)
    pub description: String,

    /// Last reported fraction
    pub fraction: f64,
}

impl GaugeView {
    /// Gauge ratio, quantized to the gauge resolution
    pub fn ratio(&self) -> f64 {
        scaled_position(self.fraction, GAUGE_RESOLUTION) as f64 / GAUGE_RESOLUTION as f64
    }
}

/// Render the window contents
pub fn draw_gauge(frame: &mut Frame<'_>, view: &GaugeView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let description = Paragraph::new(view.description.as_str())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(" Command "));
    frame.render_widget(description, chunks[0]);

    let ratio = view.ratio();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{:.1}%", ratio * 100.0));
    frame.render_widget(gauge, chunks[1]);

    let label = Paragraph::new(format_fraction(view.fraction))
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(label, chunks[2]);
}

/// Full-screen terminal reporter
pub struct GraphicalReporter {
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    view: GaugeView,
}

impl GraphicalReporter {
    /// Create a reporter; the terminal is taken over on `start`
    pub fn new() -> Self {
        Self {
            terminal: None,
            view: GaugeView::default(),
        }
    }

    fn redraw(&mut self) -> ReporterResult<()> {
        let terminal = self.terminal.as_mut().ok_or(ReporterError::NotStarted)?;
        let view = &self.view;
        terminal.draw(|f| draw_gauge(f, view))?;
        Ok(())
    }

    /// Drain pending terminal events without blocking
    fn pump_events(&mut self) -> ReporterResult<()> {
        let mut resized = false;
        while event::poll(Duration::ZERO)? {
            if let Event::Resize(_, _) = event::read()? {
                resized = true;
            }
        }

        if resized {
            if let Some(terminal) = self.terminal.as_mut() {
                terminal.autoresize()?;
            }
        }
        Ok(())
    }

    fn restore_terminal(&mut self) -> ReporterResult<()> {
        if let Some(mut terminal) = self.terminal.take() {
            let _ = terminal.show_cursor();
            disable_raw_mode()?;
            stdout().execute(LeaveAlternateScreen)?;
        }
        Ok(())
    }
}

impl Default for GraphicalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for GraphicalReporter {
    fn start(&mut self, description: &str) -> ReporterResult<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        terminal.hide_cursor()?;
        self.terminal = Some(terminal);

        self.view = GaugeView {
            description: description.to_string(),
            fraction: 0.0,
        };
        self.redraw()
    }

    fn on_progress(&mut self, fraction: f64) -> ReporterResult<()> {
        self.view.fraction = fraction;
        self.pump_events()?;
        self.redraw()
    }

    fn idle(&mut self) -> ReporterResult<()> {
        self.pump_events()?;
        self.redraw()
    }

    fn stop(&mut self) -> ReporterResult<()> {
        self.restore_terminal()
    }
}

impl Drop for GraphicalReporter {
    fn drop(&mut self) {
        // Always hand the terminal back, even if `stop` was never reached.
        let _ = self.restore_terminal();
    }
}
