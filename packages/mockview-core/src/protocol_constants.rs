//! Fixed protocol constants shared with the interview backend.
//!
//! These values are dictated by the backend's HTTP contract and the audio
//! framing it uses. Changing them breaks compatibility with the server.

// ─────────────────────────────────────────────────────────────────────────────
// Endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Backend used when nothing else is configured (local development server).
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";

/// Starts a new interview for a subject and streams the first question.
pub const START_INTERVIEW_PATH: &str = "/start-interview";

/// Accepts a recorded answer and streams the next question.
pub const SUBMIT_ANSWER_PATH: &str = "/submit-answer";

/// Returns the final interview feedback as JSON.
pub const GET_FEEDBACK_PATH: &str = "/get-feedback";

/// Timeout for establishing a connection to the backend (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Longest silence allowed between two reads of a response (seconds).
///
/// Generous because the backend transcribes the answer and runs the model
/// before the first byte of speech is sent. A streamed reply may take any
/// total time as long as it keeps producing data.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;

/// Deadline for a whole JSON request such as feedback (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Response Headers
// ─────────────────────────────────────────────────────────────────────────────

/// Number of the question being asked in this reply.
pub const QUESTION_NUMBER_HEADER: &str = "X-Question-Number";

/// Set to `true` on the reply that concludes the interview.
pub const INTERVIEW_COMPLETE_HEADER: &str = "X-Interview-Complete";

/// Content type marker for a streamed speech reply.
///
/// Anything else is treated as a JSON reply.
pub const AUDIO_STREAM_CONTENT_TYPE: &str = "text/plain";

// ─────────────────────────────────────────────────────────────────────────────
// Audio
// ─────────────────────────────────────────────────────────────────────────────

/// Codec of the decoded speech frames.
pub const SPEECH_MIME_TYPE: &str = "audio/mpeg";

/// Multipart field carrying the recorded answer.
pub const ANSWER_FIELD_NAME: &str = "audio";

/// File name the backend expects for the recorded answer.
pub const ANSWER_FILE_NAME: &str = "answer.webm";

/// MIME type of the recorded answer.
pub const ANSWER_MIME_TYPE: &str = "audio/webm";

/// Player started for each speech reply when none is configured.
///
/// Reads MP3 from stdin, plays without a window and exits at end of input.
pub const DEFAULT_PLAYER_COMMAND: &[&str] =
    &["ffplay", "-nodisp", "-autoexit", "-loglevel", "error", "-i", "-"];

/// Highest score the backend hands out.
pub const MAX_CANDIDATE_SCORE: f64 = 5.0;
