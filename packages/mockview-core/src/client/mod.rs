//! HTTP client for the interview backend.
//!
//! Three endpoints drive an interview:
//!
//! - `POST /start-interview` with `{"subject": ...}` returns the first question
//! - `POST /submit-answer` with the recorded answer returns the next question
//! - `POST /get-feedback` returns the final assessment as JSON
//!
//! Questions normally come back as spoken audio: a `text/plain` body of
//! newline-delimited base64 MP3 frames, handed out unread as a byte stream so
//! playback can start before the reply is complete.

mod types;

pub use types::{AudioBody, Feedback, InterviewReply, Recording, ReplyBody, Subject};

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::json;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::interview::InterviewPhase;
use crate::protocol_constants::{
    ANSWER_FIELD_NAME, ANSWER_MIME_TYPE, AUDIO_STREAM_CONTENT_TYPE, GET_FEEDBACK_PATH,
    INTERVIEW_COMPLETE_HEADER, QUESTION_NUMBER_HEADER, START_INTERVIEW_PATH, SUBMIT_ANSWER_PATH,
};
use crate::utils::{parse_flag_header, parse_number_header};
use types::FeedbackEnvelope;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while driving an interview.
#[derive(Debug, Error)]
pub enum InterviewError {
    /// The request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// The backend's reply could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The backend could not produce feedback (`success: false`).
    #[error("Feedback unavailable: {0}")]
    Feedback(String),

    /// Submit was requested without a recorded answer.
    #[error("No recorded answer to submit")]
    NoRecording,

    /// The action is not allowed in the current interview phase.
    #[error("Cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: InterviewPhase,
    },

    /// The client configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenient Result alias for interview operations.
pub type InterviewResult<T> = Result<T, InterviewError>;

impl InterviewError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus(status, _) => *status >= 500,
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The interview backend, as seen by front-ends.
#[async_trait]
pub trait InterviewApi: Send + Sync {
    /// Starts a new interview on `subject` and returns the first question.
    async fn start_interview(&self, subject: Subject) -> InterviewResult<InterviewReply>;

    /// Uploads a recorded answer and returns the next question.
    async fn submit_answer(&self, recording: Recording) -> InterviewResult<InterviewReply>;

    /// Requests the end-of-interview assessment.
    async fn get_feedback(&self) -> InterviewResult<Feedback>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// reqwest-based [`InterviewApi`] implementation.
#[derive(Debug, Clone)]
pub struct InterviewClient {
    client: Client,
    config: ClientConfig,
}

impl InterviewClient {
    /// Builds a client after validating `config`.
    pub fn new(config: ClientConfig) -> InterviewResult<Self> {
        config.validate().map_err(InterviewError::Configuration)?;
        // No client-wide deadline: a spoken reply streams for as long as the
        // backend keeps producing it, bounded only by the idle read timeout.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn into_reply(response: Response) -> InterviewResult<InterviewReply> {
        let response = ensure_success(response).await?;
        let headers = response.headers();
        let question_number = parse_number_header(header_str(headers, QUESTION_NUMBER_HEADER));
        let complete = parse_flag_header(header_str(headers, INTERVIEW_COMPLETE_HEADER));

        let is_audio = header_str(headers, CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.contains(AUDIO_STREAM_CONTENT_TYPE));

        let body = if is_audio {
            log::debug!(
                "[Client] Audio reply (question={:?}, complete={})",
                question_number,
                complete
            );
            ReplyBody::Audio(response.bytes_stream().map_err(InterviewError::from).boxed())
        } else {
            let value: serde_json::Value = response
                .json()
                .await
                .map_err(|e| InterviewError::InvalidResponse(e.to_string()))?;
            log::debug!("[Client] JSON reply: {}", value);
            ReplyBody::Json(value)
        };

        Ok(InterviewReply {
            question_number,
            complete,
            body,
        })
    }
}

#[async_trait]
impl InterviewApi for InterviewClient {
    async fn start_interview(&self, subject: Subject) -> InterviewResult<InterviewReply> {
        let url = self.config.endpoint(START_INTERVIEW_PATH);
        log::info!("[Client] Starting {} interview at {}", subject, url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "subject": subject.name() }))
            .send()
            .await?;
        Self::into_reply(response).await
    }

    async fn submit_answer(&self, recording: Recording) -> InterviewResult<InterviewReply> {
        if recording.is_empty() {
            return Err(InterviewError::NoRecording);
        }
        let url = self.config.endpoint(SUBMIT_ANSWER_PATH);
        log::info!("[Client] Submitting {} byte answer to {}", recording.len(), url);

        let part = Part::bytes(recording.bytes.to_vec())
            .file_name(recording.file_name)
            .mime_str(ANSWER_MIME_TYPE)?;
        let form = Form::new().part(ANSWER_FIELD_NAME, part);

        let response = self.client.post(&url).multipart(form).send().await?;
        Self::into_reply(response).await
    }

    async fn get_feedback(&self) -> InterviewResult<Feedback> {
        let url = self.config.endpoint(GET_FEEDBACK_PATH);
        log::info!("[Client] Requesting feedback from {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .json(&json!({}))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // A failed generation comes back as a 500 with a JSON `success: false`
        // envelope, so the body is inspected before the status.
        match serde_json::from_str::<FeedbackEnvelope>(&text) {
            Ok(envelope) if envelope.success => {
                let payload = envelope
                    .feedback
                    .ok_or_else(|| InterviewError::InvalidResponse("missing feedback".into()))?;
                Ok(Feedback::from(payload))
            }
            Ok(envelope) => {
                let reason = envelope.error.unwrap_or_else(|| "unknown error".to_string());
                log::warn!("[Client] Feedback generation failed: {}", reason);
                Err(InterviewError::Feedback(reason))
            }
            Err(_) if !status.is_success() => Err(InterviewError::HttpStatus(status.as_u16(), text)),
            Err(e) => Err(InterviewError::InvalidResponse(e.to_string())),
        }
    }
}

async fn ensure_success(response: Response) -> InterviewResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let text = response.text().await.unwrap_or_default();
    log::warn!("[Client] {} returned {}: {}", url, status, text);
    Err(InterviewError::HttpStatus(status.as_u16(), text))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> InterviewClient {
        InterviewClient::new(ClientConfig {
            api_base_url: server.uri(),
            request_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    /// Serves one chunked `text/plain` reply, writing `chunk` every `gap`.
    async fn trickle_server(chunk: &'static str, count: usize, gap: Duration) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\n\r\n",
                )
                .await
                .unwrap();
            for _ in 0..count {
                tokio::time::sleep(gap).await;
                let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                socket.write_all(frame.as_bytes()).await.unwrap();
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn collect_audio(body: ReplyBody) -> Vec<u8> {
        let ReplyBody::Audio(mut stream) = body else {
            panic!("expected an audio reply");
        };
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn start_posts_subject_and_streams_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-interview"))
            .and(body_json(json!({"subject": "Generative AI"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/plain; charset=utf-8")
                    .set_body_string("SUQz\nAAAA\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let reply = client.start_interview(Subject::GenerativeAi).await.unwrap();
        assert!(reply.is_audio());
        assert_eq!(reply.question_number, None);
        assert!(!reply.complete);
        assert_eq!(collect_audio(reply.body).await, b"SUQz\nAAAA\n");
    }

    #[tokio::test]
    async fn submit_parses_turn_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit-answer"))
            .and(header_exists("content-type"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/plain")
                    .insert_header("X-Question-Number", "5")
                    .insert_header("X-Interview-Complete", "true")
                    .set_body_string("AAAA\n"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let reply = client
            .submit_answer(Recording::new(b"webm-bytes".to_vec()))
            .await
            .unwrap();
        assert_eq!(reply.question_number, Some(5));
        assert!(reply.complete);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"audio\""));
        assert!(body.contains("filename=\"answer.webm\""));
        assert!(body.contains("audio/webm"));
        assert!(body.contains("webm-bytes"));
    }

    #[tokio::test]
    async fn non_audio_reply_is_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-interview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"question": "Hi?"})))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .await
            .start_interview(Subject::Python)
            .await
            .unwrap();
        assert_eq!(reply.question_text(), Some("Hi?"));
    }

    #[tokio::test]
    async fn empty_recording_is_rejected_locally() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .await
            .submit_answer(Recording::new(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::NoRecording));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit-answer"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .submit_answer(Recording::new(vec![1u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::HttpStatus(503, ref body) if body == "busy"));
        assert!(err.is_transient());
        assert_eq!(err.code(), "http_error_status");
    }

    #[tokio::test]
    async fn feedback_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-feedback"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "feedback": {
                    "subject": "Python",
                    "candidate_score": 4,
                    "feedback": "Clear answers.",
                    "areas_of_improvement": "Go deeper on generators."
                }
            })))
            .mount(&server)
            .await;

        let feedback = client_for(&server).await.get_feedback().await.unwrap();
        assert_eq!(feedback.subject.as_deref(), Some("Python"));
        assert_eq!(feedback.candidate_score, 4.0);
        assert_eq!(feedback.feedback, "Clear answers.");
    }

    #[tokio::test]
    async fn feedback_failure_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-feedback"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Failed to parse feedback: bad json",
                "raw": "..."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.get_feedback().await.unwrap_err();
        match err {
            InterviewError::Feedback(reason) => assert!(reason.contains("bad json")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn feedback_non_json_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-feedback"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.get_feedback().await.unwrap_err();
        assert!(matches!(err, InterviewError::HttpStatus(502, _)));
    }

    #[tokio::test]
    async fn slow_audio_reply_outlives_request_deadline() {
        let base = trickle_server("QQ==\n", 4, Duration::from_millis(600)).await;
        let client = InterviewClient::new(ClientConfig {
            api_base_url: base,
            read_timeout_secs: 2,
            request_timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let reply = client.start_interview(Subject::Python).await.unwrap();
        assert!(reply.is_audio());
        assert_eq!(collect_audio(reply.body).await, "QQ==\n".repeat(4).as_bytes());
    }

    #[tokio::test]
    async fn feedback_is_bounded_by_request_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-feedback"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "feedback": {}}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = InterviewClient::new(ClientConfig {
            api_base_url: server.uri(),
            request_timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();
        let err = client.get_feedback().await.unwrap_err();
        assert!(matches!(err, InterviewError::Http(ref e) if e.is_timeout()));
        assert!(err.is_transient());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = InterviewClient::new(ClientConfig {
            api_base_url: "localhost:5000".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }
}
