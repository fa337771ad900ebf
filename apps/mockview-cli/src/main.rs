//! Mockview - terminal front-end for voice mock interviews.
//!
//! Plays the interviewer's questions through an external player as they
//! stream in, uploads recorded answers given as file paths, and prints the
//! final assessment.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mockview_core::{
    AfterPlayback, ErrorCode, Feedback, InterviewApi, InterviewClient, InterviewReply,
    InterviewState, LoggingEventEmitter, PlaybackOutcome, ProcessBackend, Recording, ReplyBody,
    StreamOrchestrator, Subject,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::signal;

use crate::config::CliConfig;

/// Mockview - practice spoken interviews from the terminal.
#[derive(Parser, Debug)]
#[command(name = "mockview")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "MOCKVIEW_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Interview backend base URL (overrides config file).
    #[arg(short = 'u', long)]
    api_base_url: Option<String>,

    /// Interview subject, e.g. "Python" or "generative-ai". Asked for if omitted.
    #[arg(short, long)]
    subject: Option<Subject>,

    /// Player command line reading MP3 from stdin (overrides config file).
    #[arg(short, long)]
    player: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Mockview v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.api_base_url {
        config.api_base_url = url;
    }
    if let Some(player) = args.player.as_deref() {
        config.set_player(player);
    }

    log::info!(
        "Configuration: api_base_url={}, player={:?}",
        config.api_base_url,
        config.player
    );

    let client = InterviewClient::new(config.to_client_config())
        .context("Invalid interview backend configuration")?;
    let playback = config.to_playback_config();
    playback
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid player configuration")?;
    let backend = ProcessBackend::from_config(&playback).context("Invalid player command")?;

    let mut session = Session {
        client,
        orchestrator: StreamOrchestrator::new(Arc::new(backend), Arc::new(LoggingEventEmitter)),
        state: InterviewState::new(),
        input: BufReader::new(tokio::io::stdin()).lines(),
    };

    tokio::select! {
        result = session.run(args.subject) => result?,
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
            println!();
        }
    }

    session.orchestrator.cancel().await;
    log::info!("Shutdown complete");
    Ok(())
}

/// One interactive interview.
struct Session<A, R> {
    client: A,
    orchestrator: StreamOrchestrator,
    state: InterviewState,
    input: Lines<R>,
}

impl<A: InterviewApi, R: AsyncBufRead + Unpin> Session<A, R> {
    async fn run(&mut self, subject: Option<Subject>) -> Result<()> {
        let subject = match subject {
            Some(subject) => subject,
            None => match self.choose_subject().await? {
                Some(subject) => subject,
                None => return Ok(()),
            },
        };
        self.state.select_subject(subject);

        let Some(reply) = self.start().await? else {
            return Ok(());
        };
        let mut next = self.handle_reply(reply).await?;
        loop {
            match next {
                AfterPlayback::AwaitAnswer => match self.answer().await? {
                    Some(reply) => next = self.handle_reply(reply).await?,
                    None => return Ok(()),
                },
                AfterPlayback::FetchFeedback => {
                    self.feedback().await?;
                    return Ok(());
                }
            }
        }
    }

    /// Starts the interview, offering a retry while the backend is unreachable.
    async fn start(&mut self) -> Result<Option<InterviewReply>> {
        loop {
            let subject = self.state.begin_start()?;
            println!("Connecting to the {} interviewer...", subject);
            match self.client.start_interview(subject).await {
                Ok(reply) => return Ok(Some(reply)),
                Err(e) => {
                    log::warn!("Start failed ({}): {}", e.code(), e);
                    self.state.on_request_failed();
                    println!("Backend not connected: {}", e);
                }
            }
            if !self.retry("Press Enter to try again (:quit to exit)> ").await? {
                return Ok(None);
            }
        }
    }

    async fn choose_subject(&mut self) -> Result<Option<Subject>> {
        println!("Choose an interview subject:");
        for (i, subject) in Subject::ALL.iter().enumerate() {
            println!("  {}. {}", i + 1, subject);
        }
        loop {
            let Some(line) = self.prompt("Subject> ").await? else {
                return Ok(None);
            };
            let choice = line.trim();
            let picked = match choice.parse::<usize>() {
                Ok(n) if (1..=Subject::ALL.len()).contains(&n) => Ok(Subject::ALL[n - 1]),
                Ok(_) => Err("no such subject number".to_string()),
                Err(_) => choice.parse::<Subject>(),
            };
            match picked {
                Ok(subject) => return Ok(Some(subject)),
                Err(e) => println!("{}", e),
            }
        }
    }

    /// Plays a spoken reply (or takes a text one) and returns the follow-up.
    async fn handle_reply(&mut self, reply: InterviewReply) -> Result<AfterPlayback> {
        if let Some(next) = self.state.on_reply(&reply)? {
            if let Some(question) = reply.question_text() {
                println!("Interviewer: {}", question);
            }
            return Ok(next);
        }
        let ReplyBody::Audio(audio) = reply.body else {
            bail!("audio reply without an audio body");
        };

        println!("Question {} (listening...)", self.state.question_number());
        let mut handle = self
            .orchestrator
            .begin(audio, |outcome| {
                log::debug!("Reply fully received: {:?}", outcome);
            })
            .await;

        let outcome = (&mut handle.playback_ended).await;
        if let PlaybackOutcome::Failed { reason } = &outcome {
            println!("Could not play the question: {}", reason);
        }
        Ok(self.state.on_playback_finished(&outcome)?)
    }

    /// Reads an answer file and submits it. `None` means the candidate quit.
    async fn answer(&mut self) -> Result<Option<InterviewReply>> {
        loop {
            let prompt = format!(
                "Answer {} - path to your recording (:end to finish, :quit to exit)> ",
                self.state.question_number()
            );
            let Some(line) = self.prompt(&prompt).await? else {
                return Ok(None);
            };
            match line.trim() {
                "" => continue,
                ":quit" => return Ok(None),
                ":end" => {
                    self.state.end_interview()?;
                    self.feedback().await?;
                    return Ok(None);
                }
                path => {
                    let bytes = match tokio::fs::read(path).await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            println!("Cannot read {}: {}", path, e);
                            continue;
                        }
                    };
                    if let Err(e) = self.state.attach_recording(Recording::new(bytes)) {
                        println!("{}", e);
                        continue;
                    }
                }
            }

            let recording = self.state.begin_submit()?;
            println!("Submitting...");
            match self.client.submit_answer(recording).await {
                Ok(reply) => return Ok(Some(reply)),
                Err(e) => {
                    log::warn!("Submit failed ({}): {}", e.code(), e);
                    self.state.on_request_failed();
                    println!("Connection error: {}. Try again.", e);
                }
            }
        }
    }

    /// Fetches and prints the assessment. A failed request leaves the
    /// interview ended and offers a retry.
    async fn feedback(&mut self) -> Result<()> {
        loop {
            println!("Generating feedback...");
            match self.client.get_feedback().await {
                Ok(feedback) => {
                    let subject = self.state.subject().map(Subject::name).unwrap_or_default();
                    print_feedback(&feedback, subject);
                    self.state.show_feedback(feedback)?;
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Feedback failed ({}): {}", e.code(), e);
                    println!("Error - {}", e);
                }
            }
            if !self.retry("Press Enter to retry (:quit to exit)> ").await? {
                return Ok(());
            }
        }
    }

    /// Returns false on `:quit` or end of input.
    async fn retry(&mut self, prompt: &str) -> Result<bool> {
        Ok(match self.prompt(prompt).await? {
            Some(line) => line.trim() != ":quit",
            None => false,
        })
    }

    async fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        use std::io::Write;

        print!("{}", prompt);
        std::io::stdout().flush().context("Failed to write to stdout")?;
        self.input
            .next_line()
            .await
            .context("Failed to read from stdin")
    }
}

fn print_feedback(feedback: &Feedback, subject: &str) {
    println!();
    println!("── Feedback: {} ──", feedback.subject_or(subject));
    println!(
        "Score: {}/5 ({:.0}%)",
        feedback.candidate_score,
        feedback.score_ratio() * 100.0
    );
    println!();
    println!("Strengths:");
    println!("  {}", feedback.feedback);
    println!();
    println!("Areas of improvement:");
    println!("  {}", feedback.areas_of_improvement);
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
