//! Speech capability traits and scripted implementations.
//!
//! These traits allow swapping real backends for mocks, so the practice
//! loop can be tested without audio hardware.

use crate::error::{Result, SchoolError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Plays a line of text aloud.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` and return once playback has finished.
    async fn speak(&self, text: &str, language: &str) -> Result<()>;

    /// Cancel an utterance still in flight.
    async fn cancel(&self) -> Result<()> {
        Ok(())
    }

    /// Name for logging/debugging.
    fn name(&self) -> &str;
}

/// Captures one spoken utterance and returns its transcript.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen once and return the single best transcript.
    async fn recognize(&self, language: &str) -> Result<String>;

    /// Release the previous recognition attempt.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Whether the environment actually provides recognition.
    fn is_available(&self) -> bool {
        true
    }

    /// Name for logging/debugging.
    fn name(&self) -> &str;
}

#[async_trait::async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn speak(&self, text: &str, language: &str) -> Result<()> {
        (**self).speak(text, language).await
    }

    async fn cancel(&self) -> Result<()> {
        (**self).cancel().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait::async_trait]
impl<T: SpeechRecognizer + ?Sized> SpeechRecognizer for Arc<T> {
    async fn recognize(&self, language: &str) -> Result<String> {
        (**self).recognize(language).await
    }

    async fn stop(&self) -> Result<()> {
        (**self).stop().await
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// One call made against a capability, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Speak { text: String, language: String },
    CancelSpeech,
    Listen { language: String },
    StopRecognition,
}

/// Shared, ordered record of capability calls.
#[derive(Debug, Clone, Default)]
pub struct SpeechJournal {
    calls: Arc<Mutex<Vec<SpeechCall>>>,
}

impl SpeechJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: SpeechCall) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<SpeechCall> {
        lock(&self.calls).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock synthesizer for testing
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer {
    journal: SpeechJournal,
    delay: Option<Duration>,
    should_fail: bool,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls into a journal shared with other mocks
    pub fn with_journal(mut self, journal: SpeechJournal) -> Self {
        self.journal = journal;
        self
    }

    /// Make each utterance take `delay` to play
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configure the mock to fail on speak
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn journal(&self) -> &SpeechJournal {
        &self.journal
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn speak(&self, text: &str, language: &str) -> Result<()> {
        self.journal.record(SpeechCall::Speak {
            text: text.to_string(),
            language: language.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(SchoolError::SynthesisFailed {
                message: "mock synthesis failure".to_string(),
            });
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.journal.record(SpeechCall::CancelSpeech);
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-synthesizer"
    }
}

/// Scripted outcome of one recognition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Transcript(String),
    Error(String),
    /// Never answers; exercises the recognition timeout.
    Silence,
}

/// Mock recognizer replaying a script of outcomes
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    journal: SpeechJournal,
    script: Arc<Mutex<VecDeque<Heard>>>,
    unavailable: bool,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue transcripts returned by successive attempts
    pub fn with_transcripts<I, S>(self, transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(transcripts.into_iter().map(|t| Heard::Transcript(t.into())))
    }

    pub fn with_script(self, outcomes: impl IntoIterator<Item = Heard>) -> Self {
        lock(&self.script).extend(outcomes);
        self
    }

    pub fn with_journal(mut self, journal: SpeechJournal) -> Self {
        self.journal = journal;
        self
    }

    /// Simulate an environment without recognition support
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn journal(&self) -> &SpeechJournal {
        &self.journal
    }

    /// Outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn recognize(&self, language: &str) -> Result<String> {
        self.journal.record(SpeechCall::Listen {
            language: language.to_string(),
        });
        let next = lock(&self.script).pop_front();
        match next {
            Some(Heard::Transcript(text)) => Ok(text),
            Some(Heard::Error(message)) => Err(SchoolError::RecognitionFailed { message }),
            Some(Heard::Silence) => std::future::pending::<Result<String>>().await,
            None => Err(SchoolError::RecognitionFailed {
                message: "mock script exhausted".to_string(),
            }),
        }
    }

    async fn stop(&self) -> Result<()> {
        self.journal.record(SpeechCall::StopRecognition);
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn name(&self) -> &str {
        "mock-recognizer"
    }
}
