//! Async driver executing the machine's effects against speech backends.

use crate::defaults;
use crate::error::{Result, SchoolError};
use crate::karaoke::machine::{Effect, Feedback, KaraokeEvent, Transition, transition_for};
use crate::karaoke::session::{KaraokeSession, SessionId};
use crate::karaoke::speech::{SpeechRecognizer, SpeechSynthesizer};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounds on outstanding speech operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KaraokeTimeouts {
    pub synthesis: Duration,
    pub recognition: Duration,
}

impl Default for KaraokeTimeouts {
    fn default() -> Self {
        Self {
            synthesis: Duration::from_secs(defaults::SYNTHESIS_TIMEOUT_SECS),
            recognition: Duration::from_secs(defaults::RECOGNITION_TIMEOUT_SECS),
        }
    }
}

/// Sole driver of one practice session and its speech capabilities.
///
/// Effects run strictly in the order the machine requests them, so
/// recognition for a line never starts before its playback has finished.
pub struct KaraokeRunner {
    session: KaraokeSession,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    recognizer: Arc<dyn SpeechRecognizer>,
    timeouts: KaraokeTimeouts,
}

impl KaraokeRunner {
    /// Fails with [`SchoolError::UnsupportedCapability`] when recognition is
    /// missing from the environment; no line is ever spoken in that case.
    pub fn new(
        session: KaraokeSession,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        timeouts: KaraokeTimeouts,
    ) -> Result<Self> {
        let recognizer = match recognizer {
            Some(r) if r.is_available() => r,
            Some(r) => {
                return Err(SchoolError::UnsupportedCapability {
                    capability: format!("speech recognition ({} not found)", r.name()),
                });
            }
            None => {
                return Err(SchoolError::UnsupportedCapability {
                    capability: "speech recognition".to_string(),
                });
            }
        };

        debug!(
            session = %session.id(),
            lines = session.lines().len(),
            synthesizer = synthesizer.name(),
            recognizer = recognizer.name(),
            "practice session ready"
        );

        Ok(Self {
            session,
            synthesizer,
            recognizer,
            timeouts,
        })
    }

    pub fn session(&self) -> &KaraokeSession {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// Discard the current session and start over with new text.
    pub fn restart(&mut self, text: &str) {
        self.session = KaraokeSession::new(text, self.session.language());
    }

    /// Run one learner-triggered turn until the session rests in Idle or Done.
    ///
    /// Returns the feedback produced along the way, in order. A correct
    /// answer chains straight into the next line within the same call.
    pub async fn play_turn(&mut self) -> Vec<Feedback> {
        let mut feedback = Vec::new();
        let mut pending: VecDeque<(SessionId, KaraokeEvent)> = VecDeque::new();
        pending.push_back((self.session.id(), KaraokeEvent::PlayRequested));

        while let Some((id, event)) = pending.pop_front() {
            let Transition { session, effects } = transition_for(&self.session, id, event);
            self.session = session;

            for effect in effects {
                if let Some(next) = self.execute(effect, &mut feedback).await {
                    pending.push_back((self.session.id(), next));
                }
            }
        }

        feedback
    }

    /// Perform one effect; returns the completion event it produced, if any.
    async fn execute(&self, effect: Effect, feedback: &mut Vec<Feedback>) -> Option<KaraokeEvent> {
        match effect {
            Effect::CancelSpeech => {
                if let Err(e) = self.synthesizer.cancel().await {
                    warn!(error = %e, "failed to cancel previous utterance");
                }
                None
            }
            Effect::Speak { text, language } => {
                match tokio::time::timeout(
                    self.timeouts.synthesis,
                    self.synthesizer.speak(&text, &language),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "synthesis failed, listening anyway"),
                    Err(_) => warn!(
                        timeout_secs = self.timeouts.synthesis.as_secs(),
                        "synthesis timed out, listening anyway"
                    ),
                }
                Some(KaraokeEvent::SpeechFinished)
            }
            Effect::StopRecognition => {
                if let Err(e) = self.recognizer.stop().await {
                    warn!(error = %e, "failed to stop previous recognition");
                }
                None
            }
            Effect::Listen { language } => {
                match tokio::time::timeout(
                    self.timeouts.recognition,
                    self.recognizer.recognize(&language),
                )
                .await
                {
                    Ok(Ok(transcript)) => Some(KaraokeEvent::Transcript(transcript)),
                    Ok(Err(e)) => Some(KaraokeEvent::RecognitionError(e.to_string())),
                    Err(_) => Some(KaraokeEvent::RecognitionError(format!(
                        "no speech recognized within {}s",
                        self.timeouts.recognition.as_secs()
                    ))),
                }
            }
            Effect::Feedback(verdict) => {
                info!(
                    session = %self.session.id(),
                    line = self.session.current_index(),
                    ?verdict,
                    "turn verdict"
                );
                feedback.push(verdict);
                None
            }
        }
    }
}
