//! Request and reply types of the interview backend.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InterviewError;
use crate::protocol_constants::{ANSWER_FILE_NAME, MAX_CANDIDATE_SCORE};

// ─────────────────────────────────────────────────────────────────────────────
// Subject
// ─────────────────────────────────────────────────────────────────────────────

/// Interview topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "Self Introduction")]
    SelfIntroduction,
    #[serde(rename = "Generative AI")]
    GenerativeAi,
    Python,
    English,
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "CSS")]
    Css,
}

impl Subject {
    pub const ALL: [Subject; 6] = [
        Subject::SelfIntroduction,
        Subject::GenerativeAi,
        Subject::Python,
        Subject::English,
        Subject::Html,
        Subject::Css,
    ];

    /// Name sent to the backend and shown to the candidate.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SelfIntroduction => "Self Introduction",
            Self::GenerativeAi => "Generative AI",
            Self::Python => "Python",
            Self::English => "English",
            Self::Html => "HTML",
            Self::Css => "CSS",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Subject {
    type Err = String;

    /// Accepts the display name or a dashed slug, case-insensitively
    /// (`"Generative AI"`, `"generative-ai"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|subject| subject.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|s| s.name()).collect();
                format!("unknown subject '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replies
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming body of a spoken reply.
pub type AudioBody = BoxStream<'static, Result<Bytes, InterviewError>>;

/// Body of a reply to start/submit.
pub enum ReplyBody {
    /// Newline-delimited base64 MP3 frames, still streaming.
    Audio(AudioBody),
    /// Any non-audio reply, parsed as JSON.
    Json(Value),
}

impl fmt::Debug for ReplyBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio(_) => f.write_str("Audio(..)"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

/// A reply to start/submit, with the turn headers already parsed.
#[derive(Debug)]
pub struct InterviewReply {
    /// `X-Question-Number`, when present and numeric.
    pub question_number: Option<u32>,
    /// `X-Interview-Complete: true`: this is the final turn.
    pub complete: bool,
    pub body: ReplyBody,
}

impl InterviewReply {
    pub fn is_audio(&self) -> bool {
        matches!(self.body, ReplyBody::Audio(_))
    }

    /// The question text of a JSON reply, if it carries one.
    pub fn question_text(&self) -> Option<&str> {
        match &self.body {
            ReplyBody::Json(value) => value.get("question").and_then(Value::as_str),
            ReplyBody::Audio(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording
// ─────────────────────────────────────────────────────────────────────────────

/// A recorded spoken answer, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub bytes: Bytes,
    pub file_name: String,
}

impl Recording {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: ANSWER_FILE_NAME.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback
// ─────────────────────────────────────────────────────────────────────────────

const NO_FEEDBACK: &str = "No feedback available";
const NO_SUGGESTIONS: &str = "No suggestions available";

/// End-of-interview assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Topic as named by the backend; `None` if it did not say.
    pub subject: Option<String>,
    /// Score on a 0 to 5 scale.
    pub candidate_score: f64,
    pub feedback: String,
    pub areas_of_improvement: String,
}

impl Feedback {
    /// The backend's subject, or `fallback` when it sent none.
    pub fn subject_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.subject.as_deref().unwrap_or(fallback)
    }

    /// Fraction of the maximum score, for progress-style rendering.
    pub fn score_ratio(&self) -> f64 {
        self.candidate_score / MAX_CANDIDATE_SCORE
    }
}

/// Wire shape of `/get-feedback`.
#[derive(Debug, Deserialize)]
pub(crate) struct FeedbackEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub feedback: Option<FeedbackPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Feedback fields as the model produced them; any of them may be missing.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeedbackPayload {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    candidate_score: Option<Value>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    areas_of_improvement: Option<String>,
}

impl From<FeedbackPayload> for Feedback {
    fn from(raw: FeedbackPayload) -> Self {
        let score = match raw.candidate_score {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        };
        Self {
            subject: non_empty(raw.subject),
            candidate_score: score.clamp(0.0, MAX_CANDIDATE_SCORE),
            feedback: non_empty(raw.feedback).unwrap_or_else(|| NO_FEEDBACK.to_string()),
            areas_of_improvement: non_empty(raw.areas_of_improvement)
                .unwrap_or_else(|| NO_SUGGESTIONS.to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_parses_names_and_slugs() {
        assert_eq!("Python".parse::<Subject>().unwrap(), Subject::Python);
        assert_eq!("generative-ai".parse::<Subject>().unwrap(), Subject::GenerativeAi);
        assert_eq!("self_introduction".parse::<Subject>().unwrap(), Subject::SelfIntroduction);
        assert_eq!("html".parse::<Subject>().unwrap(), Subject::Html);
        let err = "Rust".parse::<Subject>().unwrap_err();
        assert!(err.contains("Generative AI"));
    }

    #[test]
    fn subject_serializes_display_name() {
        let json = serde_json::to_string(&Subject::GenerativeAi).unwrap();
        assert_eq!(json, "\"Generative AI\"");
        assert_eq!(Subject::Css.to_string(), "CSS");
    }

    #[test]
    fn feedback_applies_fallbacks() {
        let raw: FeedbackPayload = serde_json::from_str(r#"{"feedback": ""}"#).unwrap();
        let feedback = Feedback::from(raw);
        assert_eq!(feedback.subject, None);
        assert_eq!(feedback.candidate_score, 0.0);
        assert_eq!(feedback.feedback, "No feedback available");
        assert_eq!(feedback.areas_of_improvement, "No suggestions available");
        assert_eq!(feedback.subject_or("Python"), "Python");
    }

    #[test]
    fn feedback_score_is_clamped_and_lenient() {
        let raw: FeedbackPayload =
            serde_json::from_str(r#"{"candidate_score": "4", "subject": "CSS"}"#).unwrap();
        let feedback = Feedback::from(raw);
        assert_eq!(feedback.candidate_score, 4.0);
        assert_eq!(feedback.subject_or("Python"), "CSS");
        assert!((feedback.score_ratio() - 0.8).abs() < f64::EPSILON);

        let raw: FeedbackPayload = serde_json::from_str(r#"{"candidate_score": 9}"#).unwrap();
        assert_eq!(Feedback::from(raw).candidate_score, 5.0);
    }

    #[test]
    fn json_reply_exposes_question() {
        let reply = InterviewReply {
            question_number: Some(2),
            complete: false,
            body: ReplyBody::Json(serde_json::json!({"question": "What is a closure?"})),
        };
        assert!(!reply.is_audio());
        assert_eq!(reply.question_text(), Some("What is a closure?"));
    }

    #[test]
    fn recording_defaults_file_name() {
        let recording = Recording::new(vec![1u8, 2, 3]);
        assert_eq!(recording.file_name, "answer.webm");
        assert_eq!(recording.len(), 3);
        assert!(!recording.is_empty());
    }
}
