//! Output rendering for the chat front end.
//!
//! Rendering consumes transcript entries and never produces them.  The
//! default implementation prints one line per entry with optional ANSI
//! styling: notices in red, greetings dimmed.

use std::io::{self, Stdout, Write};

use crate::session::SessionStatus;
use crate::transcript::{EntryKind, LengthHint, TranscriptEntry};
use crate::types::MessageRole;
use crate::utils::time::format_clock;

const ANSI_DIM: &str = "\x1b[2m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one transcript entry attributed to `speaker`.
    fn print_entry(&mut self, speaker: &str, entry: &TranscriptEntry);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the status indicator.
    fn print_status(&mut self, speaker: &str, status: SessionStatus);

    /// Warn about a long draft.  Does nothing for [`LengthHint::Normal`].
    fn print_length_hint(&mut self, hint: LengthHint, length: usize);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, style: Option<&str>, text: &str) {
        let _ = match style {
            Some(style) if self.use_color => writeln!(self.out, "{style}{text}{ANSI_RESET}"),
            _ => writeln!(self.out, "{text}"),
        };
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_entry(&mut self, speaker: &str, entry: &TranscriptEntry) {
        let clock = format_clock(&entry.created_at());
        let text = format!("[{clock}] {speaker}: {}", entry.content());
        let style = match (entry.kind(), entry.role()) {
            (EntryKind::Notice, _) => ANSI_RED,
            (EntryKind::Greeting, _) => ANSI_DIM,
            (EntryKind::Turn, MessageRole::User) => ANSI_CYAN,
            (EntryKind::Turn, MessageRole::Assistant) => ANSI_GREEN,
        };
        self.line(Some(style), &text);
    }

    fn print_error(&mut self, error: &str) {
        self.line(Some(ANSI_RED), &format!("Error: {error}"));
    }

    fn print_info(&mut self, info: &str) {
        self.line(Some(ANSI_DIM), info);
    }

    fn print_status(&mut self, speaker: &str, status: SessionStatus) {
        let style = match status {
            SessionStatus::Online => ANSI_GREEN,
            SessionStatus::Typing => ANSI_YELLOW,
            SessionStatus::Error | SessionStatus::Offline => ANSI_RED,
        };
        self.line(Some(ANSI_BOLD), speaker);
        self.line(Some(style), &format!("  {status}"));
    }

    fn print_length_hint(&mut self, hint: LengthHint, length: usize) {
        match hint {
            LengthHint::Normal => {}
            LengthHint::Warning => {
                self.line(Some(ANSI_YELLOW), &format!("({length} characters)"));
            }
            LengthHint::Limit => {
                self.line(
                    Some(ANSI_RED),
                    &format!("({length} characters; consider a shorter message)"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn rendered(use_color: bool, f: impl FnOnce(&mut PlainTextRenderer<Vec<u8>>)) -> String {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), use_color);
        f(&mut renderer);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn entry_line_has_clock_and_speaker() {
        let entry = TranscriptEntry::at(
            MessageRole::Assistant,
            EntryKind::Turn,
            "Hi there",
            datetime!(2025-05-14 09:05:00 UTC),
        );
        let out = rendered(false, |r| r.print_entry("Sam", &entry));
        assert_eq!(out, "[09:05] Sam: Hi there\n");
    }

    #[test]
    fn notices_are_red() {
        let entry = TranscriptEntry::notice("Network error.");
        let out = rendered(true, |r| r.print_entry("Sam", &entry));
        assert!(out.starts_with(ANSI_RED));
        assert!(out.trim_end().ends_with(ANSI_RESET));
    }

    #[test]
    fn length_hints() {
        assert_eq!(
            rendered(false, |r| r.print_length_hint(LengthHint::Normal, 10)),
            ""
        );
        assert!(
            rendered(false, |r| r.print_length_hint(LengthHint::Limit, 950)).contains("950")
        );
    }
}
