//! Practice session value: lines, position and turn state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one practice session.
///
/// Events are tagged with the id of the session that requested them, so a
/// late completion from a discarded session cannot touch a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One non-empty line of practice text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeLine(String);

impl PracticeLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PracticeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split source text on runs of newlines, dropping empty pieces.
///
/// Whitespace-only lines other than newlines are kept as-is.
pub fn split_lines(text: &str) -> Vec<PracticeLine> {
    text.split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| PracticeLine(line.to_string()))
        .collect()
}

/// Turn state of a session. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KaraokeState {
    Idle,
    Speaking,
    Listening,
    Done,
}

impl KaraokeState {
    /// A turn is in flight; new playback requests are ignored.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Speaking | Self::Listening)
    }
}

/// Explicit session value advanced by [`crate::karaoke::machine::transition`].
///
/// Invariant: `current_index <= lines.len()`, and `current_index == lines.len()`
/// exactly when the state is `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaraokeSession {
    pub(super) id: SessionId,
    pub(super) lines: Arc<[PracticeLine]>,
    pub(super) current_index: usize,
    pub(super) state: KaraokeState,
    pub(super) language: String,
}

impl KaraokeSession {
    /// Build a session from free text. Text without lines starts finished.
    pub fn new(text: &str, language: &str) -> Self {
        Self::from_lines(split_lines(text), language)
    }

    pub fn from_lines(lines: Vec<PracticeLine>, language: &str) -> Self {
        let state = if lines.is_empty() {
            KaraokeState::Done
        } else {
            KaraokeState::Idle
        };
        Self {
            id: SessionId::next(),
            lines: lines.into(),
            current_index: 0,
            state,
            language: language.to_string(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn lines(&self) -> &[PracticeLine] {
        &self.lines
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn state(&self) -> KaraokeState {
        self.state
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// The line being practiced, or `None` once every line is done.
    pub fn current_line(&self) -> Option<&PracticeLine> {
        self.lines.get(self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.state == KaraokeState::Done
    }
}
