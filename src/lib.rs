//! schoolai - step-by-step homework help in the terminal
//!
//! Streams a worked solution from the SchoolAI server step by step and
//! drives listen-and-repeat practice of literature and music texts.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod karaoke;
pub mod output;
pub mod stream;

// Composition root - needs the HTTP client and terminal I/O
#[cfg(feature = "cli")]
pub mod app;

// Solving stream (bytes → frames → steps → sink)
pub use stream::{
    CollectorSink, FrameDecoder, Step, StepEventParser, StepKind, StepSequence, StepSink,
    StreamingStepConsumer,
};

// Speech practice
pub use karaoke::{
    Effect, Feedback, KaraokeEvent, KaraokeRunner, KaraokeSession, KaraokeState,
    KaraokeTimeouts, SpeechRecognizer, SpeechSynthesizer,
};

// HTTP client
#[cfg(feature = "http")]
pub use api::ApiClient;

// Error handling
pub use error::{Result, SchoolError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.5.0+abc1234"` when git hash is available, `"0.5.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
