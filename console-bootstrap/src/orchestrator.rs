use crate::extractor::{self, FormState};
use crate::session;
use crate::transport::Transport;
use crate::types::{
    AttemptReport, BootstrapConfig, BootstrapError, Method, Result, EXPECTED_FIELDS,
    LITERAL_SPACE_MARKER, REDACTED_FIELDS,
};
use chrono::Utc;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Scheduled,
    Cancelled,
}

/// Fixed-interval schedule that re-runs the bootstrap until it is cancelled.
#[derive(Debug)]
pub struct RetrySchedule {
    interval: Duration,
    state: ScheduleState,
    attempts: u32,
}

impl RetrySchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: ScheduleState::Scheduled,
            attempts: 0,
        }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self::new(Duration::from_secs(config.retry_interval_seconds))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == ScheduleState::Cancelled
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Stops all future attempts.
    pub fn cancel(&mut self) {
        if self.is_cancelled() {
            warn!("Retry schedule cancelled twice");
            return;
        }
        self.state = ScheduleState::Cancelled;
        debug!("Retry schedule cancelled after {} attempt(s)", self.attempts);
    }

    /// Runs `attempt` now and then on every tick until it succeeds, then
    /// cancels. Gives up with [`BootstrapError::Shutdown`] once `shutdown`
    /// resolves. Attempts never overlap: a slow attempt pushes the next tick
    /// back.
    pub async fn drive<T, A, Fut, S>(&mut self, shutdown: S, mut attempt: A) -> Result<T>
    where
        A: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        S: Future<Output = ()>,
    {
        if self.is_cancelled() {
            return Err(BootstrapError::Config(
                "retry schedule is already cancelled".to_string(),
            ));
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => return Err(BootstrapError::Shutdown),
                _ = ticker.tick() => {}
            }

            let n = self.begin_attempt();
            let outcome = tokio::select! {
                _ = &mut shutdown => return Err(BootstrapError::Shutdown),
                outcome = attempt(n) => outcome,
            };

            match outcome {
                Ok(value) => {
                    self.cancel();
                    return Ok(value);
                }
                Err(e) => {
                    error!(
                        "Attempt {} failed: {}; retrying in {:?}",
                        n, e, self.interval
                    );
                }
            }
        }
    }
}

/// Form values ready to be posted: the scraped settings in field order plus
/// the start trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    fields: Vec<(String, String)>,
}

impl SubmissionPayload {
    /// Checks that every expected field was scraped and applies the console's
    /// submission rules.
    pub fn from_form_state(state: &FormState) -> Result<Self> {
        let mut fields = Vec::with_capacity(EXPECTED_FIELDS.len() + 1);
        for name in EXPECTED_FIELDS {
            let value = state.get(name).ok_or_else(|| BootstrapError::MissingField {
                field: name.to_string(),
            })?;
            let value = if name == "game_name" {
                format!("{}{}", LITERAL_SPACE_MARKER, value)
            } else {
                value.clone()
            };
            fields.push((name.to_string(), value));
        }
        fields.push(("start_server".to_string(), "Start".to_string()));

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// JSON view for logs with passwords masked.
    pub fn to_redacted_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| {
                let shown = if REDACTED_FIELDS.contains(&name.as_str()) {
                    "***".to_string()
                } else {
                    value.clone()
                };
                (name.clone(), Value::String(shown))
            })
            .collect();
        Value::Object(map)
    }
}

/// Logs in, reads the console's start form and submits it.
pub struct Bootstrapper {
    config: BootstrapConfig,
    transport: Transport,
}

impl Bootstrapper {
    pub fn new(config: BootstrapConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(&config)?;
        Ok(Self { config, transport })
    }

    /// One full attempt. Any error aborts this attempt only.
    pub async fn attempt(&self, attempt: u32) -> Result<AttemptReport> {
        let attempt_id = Uuid::new_v4();
        let span = info_span!("attempt", n = attempt, id = %attempt_id);
        self.start_server(attempt, attempt_id).instrument(span).await
    }

    async fn start_server(&self, attempt: u32, attempt_id: Uuid) -> Result<AttemptReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Starting game on {}", self.config.authority());

        let session =
            session::login(&self.transport, &self.config.username, &self.config.password).await?;

        let html = self
            .transport
            .send(Method::Get, &[], Some(&session))
            .await?
            .text()
            .await?;

        let state = extractor::extract(&html, &EXPECTED_FIELDS);
        let payload = SubmissionPayload::from_form_state(&state)?;

        info!("Starting server");
        match serde_json::to_string_pretty(&payload.to_redacted_json()) {
            Ok(json) => debug!("Submission:\n{}", json),
            Err(e) => warn!("Could not render submission for logging: {}", e),
        }

        let response = self
            .transport
            .send(Method::Post, payload.fields(), Some(&session))
            .await?;

        info!("Server started");
        Ok(AttemptReport {
            attempt,
            attempt_id,
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            submission_status: response.status(),
        })
    }

    /// Attempts immediately, then once per interval, until one attempt succeeds.
    pub async fn run(&self, schedule: &mut RetrySchedule) -> Result<AttemptReport> {
        self.run_until(schedule, std::future::pending::<()>()).await
    }

    /// Like [`Bootstrapper::run`] but gives up with [`BootstrapError::Shutdown`]
    /// once `shutdown` resolves.
    pub async fn run_until<F>(
        &self,
        schedule: &mut RetrySchedule,
        shutdown: F,
    ) -> Result<AttemptReport>
    where
        F: Future<Output = ()>,
    {
        let report = schedule.drive(shutdown, move |n| self.attempt(n)).await?;
        info!(
            "Attempt {} succeeded in {}ms",
            report.attempt, report.elapsed_ms
        );
        Ok(report)
    }
}
