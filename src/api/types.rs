//! Request and response bodies exchanged with the SchoolAI server.

use crate::defaults;
use crate::error::{Result, SchoolError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a task's payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Ocr,
    Reference,
}

/// School subject a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Russian,
    Literature,
    Music,
}

impl Subject {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Russian => "russian",
            Self::Literature => "literature",
            Self::Music => "music",
        }
    }

    /// Subjects whose task text is worth repeating aloud line by line.
    pub fn offers_practice(self) -> bool {
        matches!(self, Self::Literature | Self::Music)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = SchoolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Self::Math),
            "russian" => Ok(Self::Russian),
            "literature" => Ok(Self::Literature),
            "music" => Ok(Self::Music),
            other => Err(SchoolError::InvalidRequest {
                field: "subject".to_string(),
                message: format!("unknown subject '{other}'"),
            }),
        }
    }
}

/// Body of both solving endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub input_type: InputType,
    pub payload: String,
    pub subject: Subject,
    pub grade: u8,
    pub language: String,
}

impl TaskRequest {
    pub fn text(payload: impl Into<String>, subject: Subject, grade: u8, language: &str) -> Self {
        Self {
            input_type: InputType::Text,
            payload: payload.into(),
            subject,
            grade,
            language: language.to_string(),
        }
    }

    pub fn with_input_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    /// Reject requests the server would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.payload.trim().is_empty() {
            return Err(SchoolError::InvalidRequest {
                field: "payload".to_string(),
                message: "task text is empty".to_string(),
            });
        }
        validate_grade(self.grade)
    }
}

/// Languages a learner can register with.
pub const NATIVE_LANGUAGES: &[&str] = &["ru", "en", "sah"];

/// Body of `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub full_name: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    pub grade: u8,
    pub native_language: String,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().chars().count() < 2 {
            return Err(SchoolError::InvalidRequest {
                field: "full_name".to_string(),
                message: "must be at least 2 characters".to_string(),
            });
        }
        if !is_iso_date(&self.birth_date) {
            return Err(SchoolError::InvalidRequest {
                field: "birth_date".to_string(),
                message: format!("expected YYYY-MM-DD, got '{}'", self.birth_date),
            });
        }
        if !NATIVE_LANGUAGES.contains(&self.native_language.as_str()) {
            return Err(SchoolError::InvalidRequest {
                field: "native_language".to_string(),
                message: format!(
                    "'{}' is not one of {}",
                    self.native_language,
                    NATIVE_LANGUAGES.join(", ")
                ),
            });
        }
        validate_grade(self.grade)
    }
}

fn validate_grade(grade: u8) -> Result<()> {
    if !(defaults::MIN_GRADE..=defaults::MAX_GRADE).contains(&grade) {
        return Err(SchoolError::InvalidRequest {
            field: "grade".to_string(),
            message: format!(
                "must be between {} and {}",
                defaults::MIN_GRADE,
                defaults::MAX_GRADE
            ),
        });
    }
    Ok(())
}

fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

/// Stars earned by a learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: u64,
    pub monthly: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub text: String,
}
