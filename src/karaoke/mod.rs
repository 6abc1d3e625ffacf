//! Line-by-line listen-and-repeat practice.
//!
//! ```text
//! text ──▶ KaraokeSession ──▶ machine::transition ──▶ effects
//!                ▲                                      │
//!                │                                      ▼
//!                └──── events ◀──── KaraokeRunner ◀── speech backends
//! ```
//!
//! The [`machine`] is pure; the [`runner`] owns the session and performs
//! every effect, feeding completion events back in order.

pub mod command;
pub mod machine;
pub mod runner;
pub mod session;
pub mod speech;

pub use command::{
    CommandRecognizer, CommandSynthesizer, EchoSynthesizer, LineSource, StdinRecognizer,
};
pub use machine::{Effect, Feedback, KaraokeEvent, Transition, transition, transition_for};
pub use runner::{KaraokeRunner, KaraokeTimeouts};
pub use session::{KaraokeSession, KaraokeState, PracticeLine, SessionId};
pub use speech::{
    Heard, MockRecognizer, MockSynthesizer, SpeechCall, SpeechJournal, SpeechRecognizer,
    SpeechSynthesizer,
};
