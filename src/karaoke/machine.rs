//! Pure transition function for practice turns.
//!
//! ```text
//!   Idle ──play──▶ Speaking ──speech finished──▶ Listening
//!    ▲                 ▲                            │
//!    │                 └──────── match, more ───────┤
//!    ├──────────── mismatch / recognition error ────┤
//!    │                                              │
//!   Done ◀──────────────── match, last line ────────┘
//! ```
//!
//! The function never performs I/O. It returns the next session together with
//! the effects the caller must execute, in order.

use crate::karaoke::session::{KaraokeSession, KaraokeState, SessionId};
use tracing::debug;

/// Inputs the machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KaraokeEvent {
    /// Learner asked to hear the current line.
    PlayRequested,
    /// Synthesizer finished playing the line.
    SpeechFinished,
    /// Recognizer produced a transcript.
    Transcript(String),
    /// Recognizer reported an error.
    RecognitionError(String),
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Cancel any utterance still in flight.
    CancelSpeech,
    Speak { text: String, language: String },
    /// Release the previous recognition attempt before starting a new one.
    StopRecognition,
    Listen { language: String },
    Feedback(Feedback),
}

/// Per-turn verdicts shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// The line at `line_index` was repeated correctly.
    Success { line_index: usize },
    /// The learner said something else.
    Mismatch { heard: String },
    /// The recognizer failed; the turn can be retried.
    RecognitionFailed { reason: String },
    /// Every line has been repeated correctly.
    Completed,
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: KaraokeSession,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(session: &KaraokeSession) -> Self {
        Self {
            session: session.clone(),
            effects: Vec::new(),
        }
    }
}

/// Trim surrounding whitespace and case-fold.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Normalized comparison of a transcript against its target line.
pub fn is_match(transcript: &str, target: &str) -> bool {
    normalize(transcript) == normalize(target)
}

/// Apply an event addressed to session `id`; events for other sessions are ignored.
pub fn transition_for(session: &KaraokeSession, id: SessionId, event: KaraokeEvent) -> Transition {
    if session.id() != id {
        debug!(session = %session.id(), event_session = %id, "ignoring stale event");
        return Transition::unchanged(session);
    }
    transition(session, event)
}

/// Apply one event to a session.
pub fn transition(session: &KaraokeSession, event: KaraokeEvent) -> Transition {
    match (session.state, event) {
        (KaraokeState::Idle, KaraokeEvent::PlayRequested) => start_speaking(session),
        (KaraokeState::Speaking, KaraokeEvent::SpeechFinished) => {
            let mut next = session.clone();
            next.state = KaraokeState::Listening;
            Transition {
                effects: vec![
                    Effect::StopRecognition,
                    Effect::Listen {
                        language: next.language.clone(),
                    },
                ],
                session: next,
            }
        }
        (KaraokeState::Listening, KaraokeEvent::Transcript(transcript)) => {
            judge(session, &transcript)
        }
        (KaraokeState::Listening, KaraokeEvent::RecognitionError(reason)) => {
            let mut next = session.clone();
            next.state = KaraokeState::Idle;
            Transition {
                session: next,
                effects: vec![Effect::Feedback(Feedback::RecognitionFailed { reason })],
            }
        }
        (state, event) => {
            debug!(?state, ?event, "event ignored in current state");
            Transition::unchanged(session)
        }
    }
}

fn start_speaking(session: &KaraokeSession) -> Transition {
    let mut next = session.clone();
    let Some(line) = session.current_line() else {
        next.state = KaraokeState::Done;
        return Transition {
            session: next,
            effects: Vec::new(),
        };
    };

    next.state = KaraokeState::Speaking;
    Transition {
        effects: vec![
            Effect::CancelSpeech,
            Effect::Speak {
                text: line.as_str().to_string(),
                language: next.language.clone(),
            },
        ],
        session: next,
    }
}

fn judge(session: &KaraokeSession, transcript: &str) -> Transition {
    let Some(target) = session.current_line() else {
        return Transition::unchanged(session);
    };

    if !is_match(transcript, target.as_str()) {
        let mut next = session.clone();
        next.state = KaraokeState::Idle;
        return Transition {
            session: next,
            effects: vec![Effect::Feedback(Feedback::Mismatch {
                heard: normalize(transcript),
            })],
        };
    }

    let mut next = session.clone();
    let line_index = next.current_index;
    next.current_index += 1;
    let success = Effect::Feedback(Feedback::Success { line_index });

    if next.current_index == next.lines.len() {
        next.state = KaraokeState::Done;
        return Transition {
            session: next,
            effects: vec![success, Effect::Feedback(Feedback::Completed)],
        };
    }

    next.state = KaraokeState::Idle;
    let mut speaking = start_speaking(&next);
    speaking.effects.insert(0, success);
    speaking
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speak_and_hear(session: &KaraokeSession, heard: &str) -> Transition {
        let t = transition(session, KaraokeEvent::PlayRequested);
        let t = transition(&t.session, KaraokeEvent::SpeechFinished);
        transition(&t.session, KaraokeEvent::Transcript(heard.to_string()))
    }

    #[test]
    fn test_normalize_trims_and_folds_case() {
        assert_eq!(normalize(" привет \n"), "привет");
        assert!(is_match("Привет", " привет \n"));
        assert!(!is_match("привет", "пока"));
    }

    #[test]
    fn test_play_requested_starts_speaking() {
        let session = KaraokeSession::new("Мама мыла раму", "ru-RU");
        let t = transition(&session, KaraokeEvent::PlayRequested);

        assert_eq!(t.session.state(), KaraokeState::Speaking);
        assert_eq!(
            t.effects,
            vec![
                Effect::CancelSpeech,
                Effect::Speak {
                    text: "Мама мыла раму".to_string(),
                    language: "ru-RU".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_speech_finished_starts_listening() {
        let session = KaraokeSession::new("line", "en-US");
        let t = transition(&session, KaraokeEvent::PlayRequested);
        let t = transition(&t.session, KaraokeEvent::SpeechFinished);

        assert_eq!(t.session.state(), KaraokeState::Listening);
        assert_eq!(
            t.effects,
            vec![
                Effect::StopRecognition,
                Effect::Listen {
                    language: "en-US".to_string()
                }
            ]
        );
    }

    #[test]
    fn test_match_on_last_line_finishes() {
        let session = KaraokeSession::new("Мама мыла раму", "ru-RU");
        let t = speak_and_hear(&session, "мама мыла раму");

        assert_eq!(t.session.state(), KaraokeState::Done);
        assert_eq!(t.session.current_index(), 1);
        assert_eq!(
            t.effects,
            vec![
                Effect::Feedback(Feedback::Success { line_index: 0 }),
                Effect::Feedback(Feedback::Completed),
            ]
        );
    }

    #[test]
    fn test_match_with_more_lines_speaks_next_line() {
        let session = KaraokeSession::new("one\ntwo", "en-US");
        let t = speak_and_hear(&session, " ONE ");

        assert_eq!(t.session.state(), KaraokeState::Speaking);
        assert_eq!(t.session.current_index(), 1);
        assert_eq!(
            t.effects,
            vec![
                Effect::Feedback(Feedback::Success { line_index: 0 }),
                Effect::CancelSpeech,
                Effect::Speak {
                    text: "two".to_string(),
                    language: "en-US".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_mismatch_returns_to_idle_with_heard_text() {
        let session = KaraokeSession::new("Мама мыла раму", "ru-RU");
        let t = speak_and_hear(&session, "Папа мыл раму");

        assert_eq!(t.session.state(), KaraokeState::Idle);
        assert_eq!(t.session.current_index(), 0);
        assert_eq!(
            t.effects,
            vec![Effect::Feedback(Feedback::Mismatch {
                heard: "папа мыл раму".to_string()
            })]
        );
    }

    #[test]
    fn test_recognition_error_returns_to_idle() {
        let session = KaraokeSession::new("line", "ru-RU");
        let t = transition(&session, KaraokeEvent::PlayRequested);
        let t = transition(&t.session, KaraokeEvent::SpeechFinished);
        let t = transition(&t.session, KaraokeEvent::RecognitionError("no-speech".into()));

        assert_eq!(t.session.state(), KaraokeState::Idle);
        assert_eq!(t.session.current_index(), 0);
        assert_eq!(
            t.effects,
            vec![Effect::Feedback(Feedback::RecognitionFailed {
                reason: "no-speech".to_string()
            })]
        );
    }

    #[test]
    fn test_play_ignored_while_busy() {
        let session = KaraokeSession::new("line", "ru-RU");
        let speaking = transition(&session, KaraokeEvent::PlayRequested).session;
        let t = transition(&speaking, KaraokeEvent::PlayRequested);
        assert_eq!(t.session, speaking);
        assert!(t.effects.is_empty());

        let listening = transition(&speaking, KaraokeEvent::SpeechFinished).session;
        let t = transition(&listening, KaraokeEvent::PlayRequested);
        assert_eq!(t.session, listening);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        let session = KaraokeSession::new("line", "ru-RU");

        let t = transition(&session, KaraokeEvent::Transcript("line".into()));
        assert_eq!(t.session, session);

        let t = transition(&session, KaraokeEvent::SpeechFinished);
        assert_eq!(t.session, session);

        let speaking = transition(&session, KaraokeEvent::PlayRequested).session;
        let t = transition(&speaking, KaraokeEvent::Transcript("line".into()));
        assert_eq!(t.session, speaking);
    }

    #[test]
    fn test_done_session_ignores_everything() {
        let session = KaraokeSession::new("", "ru-RU");
        for event in [
            KaraokeEvent::PlayRequested,
            KaraokeEvent::SpeechFinished,
            KaraokeEvent::Transcript("x".into()),
            KaraokeEvent::RecognitionError("x".into()),
        ] {
            let t = transition(&session, event);
            assert_eq!(t.session.state(), KaraokeState::Done);
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn test_stale_session_events_are_ignored() {
        let session = KaraokeSession::new("line", "ru-RU");
        let other = KaraokeSession::new("line", "ru-RU");

        let t = transition_for(&session, other.id(), KaraokeEvent::PlayRequested);
        assert_eq!(t.session, session);
        assert!(t.effects.is_empty());

        let t = transition_for(&session, session.id(), KaraokeEvent::PlayRequested);
        assert_eq!(t.session.state(), KaraokeState::Speaking);
    }

    #[test]
    fn test_index_is_monotonic_over_scripted_outcomes() {
        let mut session = KaraokeSession::new("a\nb\nc", "en-US");
        let outcomes = ["x", "a", "b", "nope", "c"];
        let mut last_index = 0;

        for heard in outcomes {
            if session.state() == KaraokeState::Idle {
                session = transition(&session, KaraokeEvent::PlayRequested).session;
            }
            session = transition(&session, KaraokeEvent::SpeechFinished).session;
            session = transition(&session, KaraokeEvent::Transcript(heard.into())).session;

            assert!(session.current_index() >= last_index);
            assert!(session.current_index() - last_index <= 1);
            last_index = session.current_index();
        }

        assert_eq!(session.state(), KaraokeState::Done);
        assert_eq!(session.current_index(), 3);
    }
}
