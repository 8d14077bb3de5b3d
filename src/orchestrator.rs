//! The attempt orchestrator.
//!
//! [`Patrick::push`] drives a bounded, strictly sequential loop of
//! degraded-mode attempts. Each attempt emits [`PushEvent`]s to an optional
//! [`PushEventHandler`]; the handler's answer to
//! [`PushEvent::AskSatisfaction`] decides whether the loop stops. Rate-limited
//! attempts back off for `2^i` seconds and every pair of attempts is separated
//! by a one second pause.
//!
//! # Example
//!
//! ```ignore
//! use patrick_push::config::Config;
//! use patrick_push::orchestrator::Patrick;
//!
//! let patrick = Patrick::from_config(&Config::load()?)?;
//! let outcome = patrick.push("my query is slow", None).await;
//! println!("solved: {}", outcome.solved);
//! ```

use crate::config::Config;
use crate::error::PatrickError;
use crate::persona;
use crate::providers::{Sleeper, SystemTimeProvider, TimeProvider, TokioSleeper};
use crate::session_log::{SessionLog, SessionRecord, SessionRecorder};
use crate::transport::{AnthropicTransport, MockTransport, PromptMode, Transport};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pause between two consecutive attempts.
pub const INTER_ATTEMPT_PAUSE: Duration = Duration::from_secs(1);

/// Lifecycle events emitted by [`Patrick::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    AttemptStart { attempt: u32, cue: String },
    Solution { attempt: u32, text: String, tokens: u64 },
    /// The only event whose reply matters: `true` accepts the solution.
    AskSatisfaction { attempt: u32, text: String },
    Error { attempt: u32, message: String },
    RateLimit { delay_secs: u64 },
}

/// Receives [`PushEvent`]s from the attempt loop.
///
/// The loop awaits every call before continuing, so a handler may block for as
/// long as it needs (for example while a human answers). The return value is
/// ignored for every event except [`PushEvent::AskSatisfaction`].
#[async_trait]
pub trait PushEventHandler: Send {
    async fn handle(&mut self, event: PushEvent) -> bool;
}

/// Result of a [`Patrick::push`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub solved: bool,
    /// Text of the last successful attempt, if any attempt succeeded.
    pub solution: Option<String>,
    /// Number of attempts that returned a solution. Failed attempts are not
    /// counted, so this can be lower than the number of loop iterations.
    pub attempts: usize,
    pub total_tokens: u64,
}

/// Result of [`Patrick::compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub baseline: String,
    pub degraded: String,
    pub baseline_elapsed: Duration,
    pub degraded_elapsed: Duration,
}

impl Comparison {
    /// How many times faster the degraded side was, if it was faster at all.
    pub fn speedup(&self) -> Option<f64> {
        if self.degraded_elapsed < self.baseline_elapsed && !self.degraded_elapsed.is_zero() {
            Some(self.baseline_elapsed.as_secs_f64() / self.degraded_elapsed.as_secs_f64())
        } else {
            None
        }
    }
}

/// Backoff applied after a rate-limited attempt `attempt`: `2^attempt` seconds.
pub fn rate_limit_backoff(attempt: u32) -> Duration {
    2u64.checked_pow(attempt)
        .map(Duration::from_secs)
        .unwrap_or(Duration::MAX)
}

#[derive(Debug)]
struct TraceEntry {
    attempt: u32,
    text: String,
}

/// State owned by a single `push` call.
#[derive(Debug, Default)]
struct Session {
    trace: Vec<TraceEntry>,
    total_tokens: u64,
    best_solution: Option<String>,
    solved: bool,
}

/// The attempt orchestrator.
pub struct Patrick<T: Transport> {
    transport: T,
    max_attempts: u32,
    recorder: Option<Box<dyn SessionRecorder>>,
    sleeper: Box<dyn Sleeper>,
    time_provider: Box<dyn TimeProvider>,
}

impl Patrick<Box<dyn Transport>> {
    /// Builds an orchestrator from user configuration.
    ///
    /// Uses the mock transport in mock mode; otherwise requires an API key and
    /// fails with [`PatrickError::MissingCredential`] before any attempt is made.
    /// Session records go to the configured log directory when `auto_save` is on.
    pub fn from_config(config: &Config) -> Result<Self, PatrickError> {
        let transport: Box<dyn Transport> = if config.is_mock_mode() {
            info!("Using mock transport");
            Box::new(MockTransport::new())
        } else {
            let api_key = config.get_api_key().ok_or(PatrickError::MissingCredential)?;
            Box::new(
                AnthropicTransport::new(api_key)
                    .model(config.model.clone())
                    .max_tokens(config.max_tokens),
            )
        };

        let mut patrick = Patrick::new(transport).max_attempts(config.max_attempts);
        if config.auto_save {
            match config.log_dir() {
                Ok(dir) => patrick = patrick.recorder(Box::new(SessionLog::new(dir))),
                Err(e) => warn!("Session logging disabled: {}", e),
            }
        }
        Ok(patrick)
    }
}

impl<T: Transport> Patrick<T> {
    /// Creates an orchestrator with the default attempt budget, no session
    /// recording, tokio timers and the system clock.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            recorder: None,
            sleeper: Box::new(TokioSleeper),
            time_provider: Box::new(SystemTimeProvider),
        }
    }

    /// Sets the attempt budget. Values below 1 are raised to 1.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn recorder(mut self, recorder: Box<dyn SessionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn time_provider(mut self, time_provider: Box<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn get_max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs the attempt loop for `problem`.
    ///
    /// Without a handler the first successful attempt is accepted. With a
    /// handler every solution is followed by [`PushEvent::AskSatisfaction`].
    /// Per-attempt failures never escape; they become [`PushEvent::Error`].
    pub async fn push(
        &self,
        problem: &str,
        mut handler: Option<&mut dyn PushEventHandler>,
    ) -> PushOutcome {
        let mut session = Session::default();

        for attempt in 1..=self.max_attempts {
            emit(
                &mut handler,
                PushEvent::AttemptStart {
                    attempt,
                    cue: persona::attempt_cue(attempt).to_string(),
                },
            )
            .await;
            info!("Attempt {}/{}", attempt, self.max_attempts);

            match self
                .transport
                .complete(problem, attempt, PromptMode::Degraded)
                .await
            {
                Ok(completion) => {
                    session.trace.push(TraceEntry {
                        attempt,
                        text: completion.text.clone(),
                    });
                    session.total_tokens += completion.tokens;
                    session.best_solution = Some(completion.text.clone());

                    emit(
                        &mut handler,
                        PushEvent::Solution {
                            attempt,
                            text: completion.text.clone(),
                            tokens: completion.tokens,
                        },
                    )
                    .await;

                    let accepted = match handler.as_deref_mut() {
                        None => true,
                        Some(h) => {
                            h.handle(PushEvent::AskSatisfaction {
                                attempt,
                                text: completion.text,
                            })
                            .await
                        }
                    };
                    if accepted {
                        info!("Attempt {} accepted", attempt);
                        session.solved = true;
                        break;
                    }
                }
                Err(err) => {
                    warn!("Attempt {} failed: {}", attempt, err);
                    emit(
                        &mut handler,
                        PushEvent::Error {
                            attempt,
                            message: err.to_string(),
                        },
                    )
                    .await;

                    if err.is_rate_limited() && attempt < self.max_attempts {
                        let backoff = rate_limit_backoff(attempt);
                        emit(
                            &mut handler,
                            PushEvent::RateLimit {
                                delay_secs: backoff.as_secs(),
                            },
                        )
                        .await;
                        self.sleeper.sleep(backoff).await;
                    }
                }
            }

            if attempt < self.max_attempts {
                self.sleeper.sleep(INTER_ATTEMPT_PAUSE).await;
            }
        }

        for entry in &session.trace {
            debug!(
                "Attempt {} answered with {} characters",
                entry.attempt,
                entry.text.chars().count()
            );
        }

        let outcome = PushOutcome {
            solved: session.solved,
            solution: session.best_solution,
            attempts: session.trace.len(),
            total_tokens: session.total_tokens,
        };
        self.save_record(problem, &outcome);
        outcome
    }

    /// One degraded-mode attempt with no retry and no confirmation.
    ///
    /// The record written for a quick push is always marked solved.
    pub async fn quick_push(&self, problem: &str) -> Result<String, PatrickError> {
        let completion = self
            .transport
            .complete(problem, 1, PromptMode::Degraded)
            .await?;

        self.save_record(
            problem,
            &PushOutcome {
                solved: true,
                solution: Some(completion.text.clone()),
                attempts: 1,
                total_tokens: completion.tokens,
            },
        );
        Ok(completion.text)
    }

    /// Runs one baseline and one degraded exchange, one after the other.
    ///
    /// A failing side is reported as `"Error: ..."` text and does not stop the
    /// other side.
    pub async fn compare(&self, problem: &str) -> Comparison {
        let (baseline, baseline_elapsed) = self.timed(problem, PromptMode::Baseline).await;
        let (degraded, degraded_elapsed) = self.timed(problem, PromptMode::Degraded).await;

        Comparison {
            baseline,
            degraded,
            baseline_elapsed,
            degraded_elapsed,
        }
    }

    async fn timed(&self, problem: &str, mode: PromptMode) -> (String, Duration) {
        let start = Instant::now();
        let result = self.transport.complete(problem, 1, mode).await;
        let elapsed = start.elapsed();

        let text = match result {
            Ok(completion) => completion.text,
            Err(err) => {
                warn!("{:?} comparison call failed: {}", mode, err);
                format!("Error: {}", err)
            }
        };
        (text, elapsed)
    }

    fn save_record(&self, problem: &str, outcome: &PushOutcome) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        let record = SessionRecord::new(
            self.time_provider.now(),
            problem,
            outcome.solution.as_deref(),
            outcome.solved,
            outcome.attempts,
            outcome.total_tokens,
        );
        if let Err(e) = recorder.record(&record) {
            warn!("Failed to save session log: {}", e);
        }
    }
}

async fn emit(handler: &mut Option<&mut dyn PushEventHandler>, event: PushEvent) {
    if let Some(h) = handler.as_deref_mut() {
        h.handle(event).await;
    }
}
