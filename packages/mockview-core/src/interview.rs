//! Interview turn tracking.
//!
//! [`InterviewState`] records where the candidate is in an interview and
//! rejects actions the current phase does not allow:
//!
//! ```text
//! Welcome ─select─▶ Ready ─start─▶ Connecting ─reply─▶ Listening
//!                                                       │ playback finished
//!                     ┌──────────── reply ◀── Submitting ◀─submit── AwaitingAnswer
//!                     ▼                                                 │ end / final turn
//!                 Listening                                 Ended ─feedback─▶ FeedbackShown
//! ```
//!
//! The state does no I/O; front-ends call the client and the orchestrator
//! and report the results here.

use std::fmt;

use serde::Serialize;

use crate::client::{
    Feedback, InterviewError, InterviewReply, InterviewResult, Recording, ReplyBody, Subject,
};
use crate::playback::PlaybackOutcome;

/// Where the interview currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "subject", rename_all = "camelCase")]
pub enum InterviewPhase {
    /// No subject chosen.
    Welcome,
    /// Subject chosen, interview not started.
    Ready(Subject),
    /// Waiting for the first question.
    Connecting,
    /// A question is being spoken.
    Listening,
    /// The candidate may record and submit an answer.
    AwaitingAnswer,
    /// An answer is being uploaded.
    Submitting,
    /// No more questions; feedback can be requested.
    Ended,
    /// Feedback has been shown.
    FeedbackShown,
}

impl fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome => f.write_str("choosing a subject"),
            Self::Ready(subject) => write!(f, "ready to start {}", subject),
            Self::Connecting => f.write_str("connecting"),
            Self::Listening => f.write_str("the interviewer is speaking"),
            Self::AwaitingAnswer => f.write_str("awaiting an answer"),
            Self::Submitting => f.write_str("submitting an answer"),
            Self::Ended => f.write_str("the interview has ended"),
            Self::FeedbackShown => f.write_str("showing feedback"),
        }
    }
}

/// What the front-end should do once a question finished playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterPlayback {
    /// Let the candidate record an answer.
    AwaitAnswer,
    /// The last question was asked; fetch the assessment.
    FetchFeedback,
}

/// Per-interview state of a front-end.
#[derive(Debug, Clone)]
pub struct InterviewState {
    phase: InterviewPhase,
    subject: Option<Subject>,
    question_number: u32,
    recording: Option<Recording>,
    final_turn: bool,
    feedback: Option<Feedback>,
}

impl Default for InterviewState {
    fn default() -> Self {
        Self::new()
    }
}

impl InterviewState {
    pub fn new() -> Self {
        Self {
            phase: InterviewPhase::Welcome,
            subject: None,
            question_number: 0,
            recording: None,
            final_turn: false,
            feedback: None,
        }
    }

    pub fn phase(&self) -> InterviewPhase {
        self.phase
    }

    pub fn subject(&self) -> Option<Subject> {
        self.subject
    }

    /// Number of the current question; 0 before the first one.
    pub fn question_number(&self) -> u32 {
        self.question_number
    }

    pub fn is_final_turn(&self) -> bool {
        self.final_turn
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn has_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Returns true while a question is being spoken.
    pub fn is_speaking(&self) -> bool {
        self.phase == InterviewPhase::Listening
    }

    /// Recording is only possible between questions, never over speech.
    pub fn can_record(&self) -> bool {
        self.phase == InterviewPhase::AwaitingAnswer
    }

    /// Chooses the subject. Choosing the current subject again changes
    /// nothing; a different one starts over. Returns whether anything changed.
    pub fn select_subject(&mut self, subject: Subject) -> bool {
        if self.subject == Some(subject) {
            return false;
        }
        self.reset();
        self.subject = Some(subject);
        self.phase = InterviewPhase::Ready(subject);
        log::debug!("[Interview] Subject selected: {}", subject);
        true
    }

    /// Moves to `Connecting` and returns the subject to start.
    pub fn begin_start(&mut self) -> InterviewResult<Subject> {
        let InterviewPhase::Ready(subject) = self.phase else {
            return Err(self.invalid("start the interview"));
        };
        self.phase = InterviewPhase::Connecting;
        Ok(subject)
    }

    /// Records a spoken reply to start/submit; the question now plays.
    pub fn on_audio_reply(&mut self, question_number: Option<u32>, complete: bool) -> InterviewResult<()> {
        self.accept_reply("accept a question", question_number, complete)?;
        self.phase = InterviewPhase::Listening;
        Ok(())
    }

    /// Records a reply that has no audio; there is nothing to wait for.
    pub fn on_text_reply(
        &mut self,
        question_number: Option<u32>,
        complete: bool,
    ) -> InterviewResult<AfterPlayback> {
        self.accept_reply("accept a question", question_number, complete)?;
        Ok(self.after_question())
    }

    /// Dispatches a client reply to [`Self::on_audio_reply`] or
    /// [`Self::on_text_reply`]. Returns the follow-up when no playback is
    /// involved.
    pub fn on_reply(&mut self, reply: &InterviewReply) -> InterviewResult<Option<AfterPlayback>> {
        match reply.body {
            ReplyBody::Audio(_) => {
                self.on_audio_reply(reply.question_number, reply.complete)?;
                Ok(None)
            }
            ReplyBody::Json(_) => self
                .on_text_reply(reply.question_number, reply.complete)
                .map(Some),
        }
    }

    /// The question finished playing (or failed to); control returns to the
    /// candidate, or on the final turn the interview ends.
    pub fn on_playback_finished(&mut self, outcome: &PlaybackOutcome) -> InterviewResult<AfterPlayback> {
        if self.phase != InterviewPhase::Listening {
            return Err(self.invalid("finish playback"));
        }
        if let PlaybackOutcome::Failed { reason } = outcome {
            log::warn!("[Interview] Question {} did not play: {}", self.question_number, reason);
        }
        Ok(self.after_question())
    }

    /// The start/submit request failed; go back to where it was issued.
    ///
    /// A recorded answer is kept so it can be submitted again.
    pub fn on_request_failed(&mut self) {
        self.phase = match (self.phase, self.subject) {
            (InterviewPhase::Connecting, Some(subject)) => InterviewPhase::Ready(subject),
            (InterviewPhase::Submitting, _) => InterviewPhase::AwaitingAnswer,
            (phase, _) => phase,
        };
    }

    /// Stores the candidate's answer, replacing any earlier take.
    pub fn attach_recording(&mut self, recording: Recording) -> InterviewResult<()> {
        if !self.can_record() {
            return Err(self.invalid("record an answer"));
        }
        if recording.is_empty() {
            return Err(InterviewError::NoRecording);
        }
        self.recording = Some(recording);
        Ok(())
    }

    /// Moves to `Submitting` and returns the answer to upload.
    pub fn begin_submit(&mut self) -> InterviewResult<Recording> {
        if self.phase != InterviewPhase::AwaitingAnswer {
            return Err(self.invalid("submit an answer"));
        }
        let recording = self.recording.clone().ok_or(InterviewError::NoRecording)?;
        self.phase = InterviewPhase::Submitting;
        Ok(recording)
    }

    /// Ends the interview early at the candidate's request.
    pub fn end_interview(&mut self) -> InterviewResult<()> {
        match self.phase {
            InterviewPhase::AwaitingAnswer | InterviewPhase::Ended => {
                self.recording = None;
                self.phase = InterviewPhase::Ended;
                Ok(())
            }
            _ => Err(self.invalid("end the interview")),
        }
    }

    pub fn show_feedback(&mut self, feedback: Feedback) -> InterviewResult<()> {
        if self.phase != InterviewPhase::Ended {
            return Err(self.invalid("show feedback"));
        }
        self.feedback = Some(feedback);
        self.phase = InterviewPhase::FeedbackShown;
        Ok(())
    }

    /// Back to the subject choice, forgetting everything.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn accept_reply(
        &mut self,
        action: &'static str,
        question_number: Option<u32>,
        complete: bool,
    ) -> InterviewResult<()> {
        match self.phase {
            InterviewPhase::Connecting => {
                self.question_number = question_number.unwrap_or(1);
            }
            InterviewPhase::Submitting => {
                self.question_number = question_number.unwrap_or(self.question_number + 1);
                // The answer has been delivered.
                self.recording = None;
            }
            _ => return Err(self.invalid(action)),
        }
        self.final_turn = complete;
        log::debug!(
            "[Interview] Question {} received (final={})",
            self.question_number,
            complete
        );
        Ok(())
    }

    fn after_question(&mut self) -> AfterPlayback {
        if self.final_turn {
            self.phase = InterviewPhase::Ended;
            AfterPlayback::FetchFeedback
        } else {
            self.phase = InterviewPhase::AwaitingAnswer;
            AfterPlayback::AwaitAnswer
        }
    }

    fn invalid(&self, action: &'static str) -> InterviewError {
        InterviewError::InvalidPhase {
            action,
            phase: self.phase,
        }
    }
}
