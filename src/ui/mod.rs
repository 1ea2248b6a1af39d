//! Event stream presentation
//!
//! This module handles:
//! - Rendering keyed progress lines as in-place spinners using indicatif
//! - Plain output when stdout is not a terminal
//! - JSON lines output for front-ends and scripts
//!
//! All rendering goes through the [`EventRenderer`] trait, so `run` picks an
//! implementation from its flags.

pub mod projection;

pub use projection::{DisplayLine, DisplayProjection};

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use console::{Style, Term};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::kernel::KernelEvent;

const DONE_SUFFIX: &str = "done!";

/// Consumer of a kernel's event stream
pub trait EventRenderer: Send {
    fn render(&mut self, event: &KernelEvent) -> Result<()>;

    /// Flush anything still pending once the session ends
    fn finish(&mut self) -> Result<()>;
}

/// Interactive renderer: one spinner per display key
pub struct TerminalRenderer {
    progress: MultiProgress,
    spinners: HashMap<String, ProgressBar>,
    projection: DisplayProjection,
    interactive: bool,
    error_style: Style,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::with_interactive(Term::stdout().is_term())
    }

    /// Force interactive or plain output
    pub fn with_interactive(interactive: bool) -> Self {
        Self {
            progress: MultiProgress::new(),
            spinners: HashMap::new(),
            projection: DisplayProjection::new(),
            interactive,
            error_style: Style::new().red().bold(),
        }
    }

    pub fn projection(&self) -> &DisplayProjection {
        &self.projection
    }

    fn spinner(&mut self, key: &str) -> &ProgressBar {
        let progress = &self.progress;
        self.spinners.entry(key.to_string()).or_insert_with(|| {
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            let spinner = progress.add(ProgressBar::new_spinner());
            spinner.set_style(style);
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        })
    }

    fn show_keyed(&mut self, key: &str, message: &str) {
        let spinner = self.spinner(key).clone();
        if message.ends_with(DONE_SUFFIX) {
            spinner.finish_with_message(message.to_string());
        } else {
            spinner.set_message(message.to_string());
        }
    }

    fn println(&self, line: &str) {
        if self.progress.println(line).is_err() {
            println!("{line}");
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRenderer for TerminalRenderer {
    fn render(&mut self, event: &KernelEvent) -> Result<()> {
        self.projection.apply(event);

        if !self.interactive {
            // Plain mode prints the settled projection at the end; errors go out now
            if let KernelEvent::ErrorProduced { message, .. } | KernelEvent::CommandFailed { message, .. } = event {
                eprintln!("{}", self.error_style.apply_to(message));
            }
            return Ok(());
        }

        match event {
            KernelEvent::DisplayedValueProduced {
                message,
                key: Some(key),
                ..
            }
            | KernelEvent::DisplayedValueUpdated { message, key, .. } => {
                self.show_keyed(key, message);
            }
            KernelEvent::DisplayedValueProduced {
                message, key: None, ..
            } => self.println(message),
            KernelEvent::ErrorProduced { message, .. }
            | KernelEvent::CommandFailed { message, .. } => {
                let line = self.error_style.apply_to(message).to_string();
                self.println(&line);
            }
            KernelEvent::PackageAdded { .. } | KernelEvent::CommandSucceeded { .. } => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.interactive {
            for spinner in self.spinners.values() {
                if !spinner.is_finished() {
                    spinner.abandon();
                }
            }
            return Ok(());
        }

        let mut stdout = std::io::stdout().lock();
        for line in self.projection.lines() {
            if let DisplayLine::Value(message) = line {
                writeln!(stdout, "{message}")?;
            }
        }
        Ok(())
    }
}

/// One JSON object per event, one event per line
pub struct JsonRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventRenderer for JsonRenderer<W> {
    fn render(&mut self, event: &KernelEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
