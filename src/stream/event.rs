//! Step records and the frame-to-step parser.

use crate::defaults::DATA_PREFIX;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One unit of a solving explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub step_type: String,
    pub content: String,
}

impl Step {
    pub fn new(step_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            content: content.into(),
        }
    }

    /// Classify the free-form type tag.
    pub fn kind(&self) -> StepKind {
        StepKind::from_tag(&self.step_type)
    }
}

/// Known step tags emitted by the solving service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Step,
    Clarify,
    Motivate,
    Error,
    /// Any tag the client does not know; the step is still kept.
    Other,
}

impl StepKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "step" => Self::Step,
            "clarify" => Self::Clarify,
            "motivate" => Self::Motivate,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }
}

/// Ordered, append-only list of steps from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSequence {
    steps: Vec<Step>,
}

impl StepSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_vec(self) -> Vec<Step> {
        self.steps
    }
}

impl<'a> IntoIterator for &'a StepSequence {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Turns one decoded frame into a [`Step`], or drops it.
///
/// Dropping is silent: a malformed frame never interrupts the stream.
#[derive(Debug, Clone, Default)]
pub struct StepEventParser {
    accept_event_lines: bool,
}

impl StepEventParser {
    /// Strict parser: the frame must start with `data:`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept frames whose `data:` line follows SSE field lines
    /// (`event:`, `id:`, `retry:`) or comments.
    pub fn with_event_lines(mut self, accept: bool) -> Self {
        self.accept_event_lines = accept;
        self
    }

    pub fn parse(&self, frame: &str) -> Option<Step> {
        let payload = match frame.strip_prefix(DATA_PREFIX) {
            Some(payload) => payload,
            None if self.accept_event_lines => match data_after_field_lines(frame) {
                Some(payload) => payload,
                None => {
                    trace!(frame, "dropping frame without data line");
                    return None;
                }
            },
            None => {
                trace!(frame, "dropping frame without data prefix");
                return None;
            }
        };

        match serde_json::from_str::<Step>(payload) {
            Ok(step) => Some(step),
            Err(e) => {
                trace!(frame, error = %e, "dropping malformed step payload");
                None
            }
        }
    }
}

/// Skip leading SSE field lines and return the payload of the first `data:` line.
fn data_after_field_lines(frame: &str) -> Option<&str> {
    let mut rest = frame;
    loop {
        if let Some(payload) = rest.strip_prefix(DATA_PREFIX) {
            return Some(payload);
        }
        let (line, tail) = rest.split_once('\n')?;
        if !is_sse_field_line(line.trim_end_matches('\r')) {
            return None;
        }
        rest = tail;
    }
}

fn is_sse_field_line(line: &str) -> bool {
    line.starts_with("event:")
        || line.starts_with("id:")
        || line.starts_with("retry:")
        || line.starts_with(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_frame() {
        let parser = StepEventParser::new();
        let step = parser
            .parse(r#"data: {"type":"step","content":"A"}"#)
            .unwrap();
        assert_eq!(step, Step::new("step", "A"));
    }

    #[test]
    fn test_parse_without_space_after_prefix() {
        let parser = StepEventParser::new();
        let step = parser
            .parse(r#"data:{"type":"clarify","content":"Что дано?"}"#)
            .unwrap();
        assert_eq!(step.kind(), StepKind::Clarify);
        assert_eq!(step.content, "Что дано?");
    }

    #[test]
    fn test_wrong_prefix_is_dropped() {
        let parser = StepEventParser::new();
        assert!(
            parser
                .parse(r#"event: {"type":"step","content":"A"}"#)
                .is_none()
        );
        assert!(parser.parse("").is_none());
    }

    #[test]
    fn test_malformed_json_is_dropped() {
        let parser = StepEventParser::new();
        assert!(parser.parse("data: not-json").is_none());
        assert!(parser.parse("data: {\"type\":\"step\"").is_none());
    }

    #[test]
    fn test_missing_fields_are_dropped() {
        let parser = StepEventParser::new();
        assert!(parser.parse(r#"data: {"type":"step"}"#).is_none());
        assert!(parser.parse(r#"data: {"content":"A"}"#).is_none());
    }

    #[test]
    fn test_non_string_fields_are_dropped() {
        let parser = StepEventParser::new();
        assert!(parser.parse(r#"data: {"type":1,"content":"A"}"#).is_none());
        assert!(
            parser
                .parse(r#"data: {"type":"step","content":null}"#)
                .is_none()
        );
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let parser = StepEventParser::new();
        let step = parser
            .parse(r#"data: {"type":"motivate","content":"Молодец!","index":3}"#)
            .unwrap();
        assert_eq!(step, Step::new("motivate", "Молодец!"));
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let parser = StepEventParser::new();
        let step = parser
            .parse(r#"data: {"type":"hint","content":"x"}"#)
            .unwrap();
        assert_eq!(step.kind(), StepKind::Other);
        assert_eq!(step.step_type, "hint");
    }

    #[test]
    fn test_strict_mode_rejects_event_line_frames() {
        let parser = StepEventParser::new();
        let frame = "event:step\ndata:{\"type\":\"step\",\"content\":\"A\"}";
        assert!(parser.parse(frame).is_none());
    }

    #[test]
    fn test_event_line_mode_accepts_sse_fields() {
        let parser = StepEventParser::new().with_event_lines(true);
        let frame = "event:step\nid: 7\n: keep-alive\ndata:{\"type\":\"step\",\"content\":\"A\"}";
        assert_eq!(parser.parse(frame), Some(Step::new("step", "A")));
    }

    #[test]
    fn test_event_line_mode_rejects_foreign_lines() {
        let parser = StepEventParser::new().with_event_lines(true);
        let frame = "hello\ndata:{\"type\":\"step\",\"content\":\"A\"}";
        assert!(parser.parse(frame).is_none());
        assert!(parser.parse("event:step").is_none());
    }

    #[test]
    fn test_step_serializes_with_type_key() {
        let json = serde_json::to_string(&Step::new("error", "oops")).unwrap();
        assert_eq!(json, r#"{"type":"error","content":"oops"}"#);
    }

    #[test]
    fn test_step_sequence_preserves_order() {
        let mut seq = StepSequence::new();
        seq.push(Step::new("step", "1"));
        seq.push(Step::new("step", "1"));
        seq.push(Step::new("step", "2"));

        let contents: Vec<&str> = seq.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "1", "2"]);
        assert_eq!(seq.len(), 3);
    }
}
