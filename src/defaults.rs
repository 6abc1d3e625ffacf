//! Default configuration constants for schoolai.
//!
//! Shared by the config types, the stream consumer and the practice runner
//! so every layer agrees on the same protocol literals and bounds.

/// Frame delimiter of the solving stream: a blank line.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Prefix that marks a meaningful frame.
pub const DATA_PREFIX: &str = "data:";

/// Default base URL of the solving service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Timeout for plain request/response calls, in seconds.
///
/// The solving stream itself has no overall deadline; only connection
/// establishment is bounded by this value.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default native language of the learner.
pub const DEFAULT_LANGUAGE: &str = "ru";

/// Default school grade.
pub const DEFAULT_GRADE: u8 = 5;

/// Lowest and highest accepted school grade.
pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 11;

/// Upper bound for one synthesized line to finish playing.
pub const SYNTHESIS_TIMEOUT_SECS: u64 = 30;

/// Upper bound for one recognition attempt.
///
/// Recognizers can hang waiting for speech that never comes; after this
/// the turn ends as a recognition failure and the learner may retry.
pub const RECOGNITION_TIMEOUT_SECS: u64 = 15;

/// Speech locale for a native language code.
///
/// English learners practice in `en-US`; every other language falls back
/// to `ru-RU`, the locale the practice texts are written in.
pub fn speech_locale(native_language: &str) -> &'static str {
    if native_language == "en" {
        "en-US"
    } else {
        "ru-RU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_locale_english() {
        assert_eq!(speech_locale("en"), "en-US");
    }

    #[test]
    fn test_speech_locale_falls_back_to_russian() {
        assert_eq!(speech_locale("ru"), "ru-RU");
        assert_eq!(speech_locale("sah"), "ru-RU");
        assert_eq!(speech_locale(""), "ru-RU");
    }

    #[test]
    fn test_frame_delimiter_is_blank_line() {
        assert_eq!(FRAME_DELIMITER, "\n\n");
    }

    #[test]
    fn test_grade_bounds() {
        assert!(MIN_GRADE <= DEFAULT_GRADE && DEFAULT_GRADE <= MAX_GRADE);
    }
}
