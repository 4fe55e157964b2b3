//! Terminal capability detection and output colouring.

use owo_colors::{colors::css, OwoColorize};

/// Whether coloured output should be emitted on stdout.
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Current terminal width in columns, if detectable.
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Whether the terminal is too narrow for table layouts (< 60 columns).
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 60)
}

/// Extension trait for colourizing output.
///
/// Colours are applied only when stdout supports them, so piped output
/// stays clean.
pub trait Colorize {
    /// Colour as success (green)
    fn success(&self) -> String;
    /// Colour as warning (amber)
    fn warning(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        let text = self.as_ref();
        if supports_color() {
            text.fg::<css::Green>().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self) -> String {
        let text = self.as_ref();
        if supports_color() {
            text.fg::<css::Orange>().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self) -> String {
        let text = self.as_ref();
        if supports_color() {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}
