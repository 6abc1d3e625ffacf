//! Terminal rendering for solution steps, practice feedback and notifications.
//! Steps go to stdout; everything else goes to stderr.

use crate::api::types::Progress;
use crate::karaoke::{Feedback, KaraokeSession};
use crate::stream::{Step, StepKind, StepSink};

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Severity of a one-line user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Success,
    Warning,
    Error,
}

impl Notice {
    fn color(self) -> &'static str {
        match self {
            Self::Info => DIM,
            Self::Success => GREEN,
            Self::Warning => YELLOW,
            Self::Error => RED,
        }
    }
}

/// Print a notification to stderr.
pub fn notify(notice: Notice, message: &str) {
    eprintln!("{}{message}{RESET}", notice.color());
}

/// Format one solution step. `color` adds ANSI styling.
pub fn format_step(step: &Step, color: bool) -> String {
    let (marker, style) = match step.kind() {
        StepKind::Step => ("•", ""),
        StepKind::Clarify => ("?", YELLOW),
        StepKind::Motivate => ("★", GREEN),
        StepKind::Error => ("✗", RED),
        StepKind::Other => ("·", DIM),
    };

    let body = match step.kind() {
        StepKind::Other => format!("[{}] {}", step.step_type, step.content),
        _ => step.content.clone(),
    };

    if color && !style.is_empty() {
        format!("{style}{marker} {body}{RESET}")
    } else {
        format!("{marker} {body}")
    }
}

/// Sink printing each step the moment it is parsed.
#[derive(Debug)]
pub struct StepPrinter {
    color: bool,
    printed: usize,
}

impl StepPrinter {
    pub fn new(color: bool) -> Self {
        Self { color, printed: 0 }
    }

    pub fn printed(&self) -> usize {
        self.printed
    }
}

impl StepSink for StepPrinter {
    fn handle(&mut self, step: &Step) {
        println!("{}", format_step(step, self.color));
        self.printed += 1;
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}

/// Format a practice verdict, numbering lines from 1.
pub fn format_feedback(feedback: &Feedback, session: &KaraokeSession) -> String {
    let total = session.lines().len();
    match feedback {
        Feedback::Success { line_index } => {
            format!("{GREEN}✓ Line {}/{total} correct{RESET}", line_index + 1)
        }
        Feedback::Mismatch { heard } => {
            format!("{YELLOW}✗ Heard \"{heard}\", try again{RESET}")
        }
        Feedback::RecognitionFailed { reason } => {
            format!("{RED}✗ Could not recognize speech: {reason}{RESET}")
        }
        Feedback::Completed => format!("{GREEN}{BOLD}★ All {total} lines done!{RESET}"),
    }
}

pub fn render_feedback(feedback: &Feedback, session: &KaraokeSession) {
    eprintln!("{}", format_feedback(feedback, session));
}

/// Prompt before the learner's next turn.
pub fn render_line_prompt(session: &KaraokeSession) {
    if let Some(line) = session.current_line() {
        eprintln!(
            "{DIM}[{}/{}]{RESET} {line}  {DIM}(Enter to listen, q to quit){RESET}",
            session.current_index() + 1,
            session.lines().len()
        );
    }
}

pub fn format_progress(progress: &Progress) -> String {
    format!(
        "★ {} stars total, {} this month",
        progress.total, progress.monthly
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_step_plain() {
        assert_eq!(format_step(&Step::new("step", "2+2=4"), false), "• 2+2=4");
        assert_eq!(
            format_step(&Step::new("clarify", "Какое число?"), false),
            "? Какое число?"
        );
        assert_eq!(format_step(&Step::new("motivate", "Молодец"), false), "★ Молодец");
        assert_eq!(format_step(&Step::new("error", "oops"), false), "✗ oops");
    }

    #[test]
    fn test_format_step_unknown_type_shows_tag() {
        assert_eq!(format_step(&Step::new("hint", "x"), false), "· [hint] x");
    }

    #[test]
    fn test_format_step_colored() {
        let s = format_step(&Step::new("motivate", "Молодец"), true);
        assert!(s.starts_with(GREEN));
        assert!(s.ends_with(RESET));

        let plain_step = format_step(&Step::new("step", "a"), true);
        assert_eq!(plain_step, "• a");
    }

    #[test]
    fn test_step_printer_counts() {
        let mut printer = StepPrinter::new(false);
        printer.handle(&Step::new("step", "a"));
        printer.handle(&Step::new("step", "b"));
        assert_eq!(printer.printed(), 2);
        assert_eq!(printer.name(), "terminal");
    }

    #[test]
    fn test_format_feedback() {
        let session = KaraokeSession::new("one\ntwo", "ru-RU");

        let s = format_feedback(&Feedback::Success { line_index: 1 }, &session);
        assert!(s.contains("Line 2/2"));

        let s = format_feedback(
            &Feedback::Mismatch {
                heard: "папа".to_string(),
            },
            &session,
        );
        assert!(s.contains("\"папа\""));

        let s = format_feedback(
            &Feedback::RecognitionFailed {
                reason: "timeout".to_string(),
            },
            &session,
        );
        assert!(s.contains("timeout"));

        assert!(format_feedback(&Feedback::Completed, &session).contains("All 2 lines"));
    }

    #[test]
    fn test_format_progress() {
        assert_eq!(
            format_progress(&Progress { total: 12, monthly: 3 }),
            "★ 12 stars total, 3 this month"
        );
    }
}
