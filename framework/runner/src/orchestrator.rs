//! Scenario state machine and post-hoc policy checks.
//!
//! A [ScenarioRun] is the single owner of the report for one invocation. Steps, batches and checks
//! are appended as the scenario executes and [ScenarioRun::conclude] evaluates the policy and seals
//! the report exactly once.

use std::time::Duration;

use canary_core::prelude::{ShutdownSignalError, StepAbortError};
use canary_summary_model::{
    BatchResult, HealthCheck, InvocationResponse, ScenarioReport, ScenarioState,
};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::batch::ConcurrentBatchRunner;
use crate::config::ScenarioThresholds;
use crate::health::HealthAggregator;
use crate::http::{HttpRequest, HttpStepRunner, StepOutcome};
use crate::types::CanaryResult;

/// Where a latency limit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyCeiling {
    /// Every recorded request latency, sequential steps and batch requests alike.
    PerStep(Duration),
    /// Wall clock time of the whole scenario.
    TotalElapsed(Duration),
}

impl LatencyCeiling {
    pub fn limit(&self) -> Duration {
        match self {
            LatencyCeiling::PerStep(limit) | LatencyCeiling::TotalElapsed(limit) => *limit,
        }
    }

    fn with_limit(self, limit: Duration) -> Self {
        match self {
            LatencyCeiling::PerStep(_) => LatencyCeiling::PerStep(limit),
            LatencyCeiling::TotalElapsed(_) => LatencyCeiling::TotalElapsed(limit),
        }
    }
}

/// Thresholds checked after all steps have run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioPolicy {
    pub latency_ceiling: Option<LatencyCeiling>,
    /// Minimum percentage of healthy checks.
    pub health_threshold: Option<f64>,
    /// Minimum percentage of successful requests over steps and batches.
    pub success_rate_floor: Option<f64>,
}

impl ScenarioPolicy {
    pub fn per_step_latency(mut self, limit: Duration) -> Self {
        self.latency_ceiling = Some(LatencyCeiling::PerStep(limit));
        self
    }

    pub fn total_latency(mut self, limit: Duration) -> Self {
        self.latency_ceiling = Some(LatencyCeiling::TotalElapsed(limit));
        self
    }

    pub fn health_threshold(mut self, threshold: f64) -> Self {
        self.health_threshold = Some(threshold);
        self
    }

    pub fn success_rate_floor(mut self, floor: f64) -> Self {
        self.success_rate_floor = Some(floor);
        self
    }

    /// Replace thresholds with configured overrides. A latency override keeps the scope of the
    /// built in ceiling and applies per step when there was none.
    pub fn apply_overrides(mut self, overrides: &ScenarioThresholds) -> Self {
        if let Some(ms) = overrides.max_response_time_ms {
            let limit = Duration::from_millis(ms);
            self.latency_ceiling = Some(match self.latency_ceiling {
                Some(ceiling) => ceiling.with_limit(limit),
                None => LatencyCeiling::PerStep(limit),
            });
        }
        if let Some(threshold) = overrides.health_threshold {
            self.health_threshold = Some(threshold);
        }
        if let Some(floor) = overrides.success_rate_floor {
            self.success_rate_floor = Some(floor);
        }
        self
    }

    /// Check the report against this policy, adding an error for every violation.
    ///
    /// Returns true when the report passes. Failed required checks count as a violation, their
    /// errors were added when they were recorded.
    pub fn evaluate(&self, report: &mut ScenarioReport, total_elapsed: Duration) -> bool {
        let violations = self.measure(report, total_elapsed);
        let passed = violations.is_empty()
            && !report.checks.iter().any(|c| c.required && !c.healthy);
        for violation in violations {
            report.push_error(violation);
        }

        passed
    }

    /// Tag the report with the measured latency, health and success rate. Returns one message per
    /// threshold that was not met, without touching the report errors.
    pub fn measure(&self, report: &mut ScenarioReport, total_elapsed: Duration) -> Vec<String> {
        let mut violations = Vec::new();

        match self.latency_ceiling {
            Some(LatencyCeiling::PerStep(limit)) => {
                let limit_ms = duration_ms(limit);
                let slow = report.latencies().filter(|latency| *latency > limit_ms).count();
                if slow > 0 {
                    violations.push(format!(
                        "Some responses were slow: {slow} responses exceeded {limit_ms}ms"
                    ));
                }
            }
            Some(LatencyCeiling::TotalElapsed(limit)) => {
                let limit_ms = duration_ms(limit);
                let elapsed_ms = duration_ms(total_elapsed);
                report.tag("total-time-ms", elapsed_ms);
                if elapsed_ms > limit_ms {
                    violations.push(format!(
                        "Total elapsed time {elapsed_ms}ms exceeded {limit_ms}ms threshold"
                    ));
                }
            }
            None => {}
        }

        if let Some(threshold) = self.health_threshold {
            let verdict = HealthAggregator::new(threshold).aggregate(&report.checks);
            report.tag("health-percentage", verdict.percentage_display());
            if !verdict.passed {
                violations.push(format!(
                    "Health percentage {}% is below {threshold}% threshold",
                    verdict.percentage_display()
                ));
            }
        }

        if let Some(floor) = self.success_rate_floor {
            let (ok, total) = report.request_counts();
            let verdict = HealthAggregator::new(floor).aggregate_counts(ok, total);
            let rate = format!("{:.2}", verdict.percentage);
            report.tag("success-rate", format!("{rate}%"));
            if !verdict.passed {
                violations.push(format!("Success rate {rate}% is below {floor}% threshold"));
            }
        }

        violations
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A concluded invocation: the sealed report and the status to hand back to the caller.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub status_code: u16,
    pub report: ScenarioReport,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.status_code == InvocationResponse::COMPLETED && self.report.success
    }
}

/// Creates scenario runs that share one HTTP step runner and policy.
#[derive(Debug, Clone)]
pub struct ScenarioOrchestrator {
    runner: HttpStepRunner,
    policy: ScenarioPolicy,
}

impl ScenarioOrchestrator {
    pub fn new(runner: HttpStepRunner, policy: ScenarioPolicy) -> Self {
        Self { runner, policy }
    }

    pub fn policy(&self) -> &ScenarioPolicy {
        &self.policy
    }

    /// Start a new run. The report moves to `Running` straight away.
    pub fn start(&self, scenario: &str) -> ScenarioRun {
        ScenarioRun::new(scenario, self.runner.clone(), self.policy.clone())
    }
}

#[derive(Debug)]
pub struct ScenarioRun {
    runner: HttpStepRunner,
    batch_runner: ConcurrentBatchRunner,
    policy: ScenarioPolicy,
    report: ScenarioReport,
    started: Instant,
    aborted: Option<StepAbortError>,
}

impl ScenarioRun {
    fn new(scenario: &str, runner: HttpStepRunner, policy: ScenarioPolicy) -> Self {
        let mut report = ScenarioReport::new(scenario);
        report.start();
        log::info!("Starting scenario [{scenario}]");

        Self {
            batch_runner: ConcurrentBatchRunner::new(runner.clone()),
            runner,
            policy,
            report,
            started: Instant::now(),
            aborted: None,
        }
    }

    pub fn report(&self) -> &ScenarioReport {
        &self.report
    }

    pub fn policy(&self) -> &ScenarioPolicy {
        &self.policy
    }

    pub fn state(&self) -> ScenarioState {
        if self.aborted.is_some() {
            ScenarioState::Failed
        } else {
            self.report.state
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Run a step that may fail without stopping the scenario. A failure is recorded in the report
    /// errors.
    pub async fn step(&mut self, name: &str, request: &HttpRequest) -> StepOutcome {
        let outcome = self.runner.execute(name, request).await;
        if !outcome.success() {
            self.report.push_error(format!(
                "{name} failed with {}",
                outcome.result.failure_reason()
            ));
        }
        self.report.record_step(outcome.result.clone());
        outcome
    }

    /// Run a step the rest of the scenario depends on. A failure aborts the run.
    pub async fn required_step(
        &mut self,
        name: &str,
        request: &HttpRequest,
    ) -> Result<StepOutcome, StepAbortError> {
        let outcome = self.runner.execute(name, request).await;
        self.report.record_step(outcome.result.clone());
        if outcome.success() {
            Ok(outcome)
        } else {
            Err(self.abort(StepAbortError::new(
                name,
                outcome.result.failure_reason(),
            )))
        }
    }

    /// Run requests concurrently and record the aggregate under `name`. Individual failures only
    /// count towards the success rate.
    pub async fn batch(
        &mut self,
        name: &str,
        requests: Vec<(String, HttpRequest)>,
        concurrency_cap: Option<usize>,
    ) -> BatchResult {
        let batch = self.batch_runner.run_batch(requests, concurrency_cap).await;
        self.report.record_batch(name, batch.clone());
        batch
    }

    /// Parse a JSON response body for step `name`. A malformed body fails the scenario.
    pub fn parse_json<T: DeserializeOwned>(
        &mut self,
        outcome: &StepOutcome,
    ) -> Result<T, StepAbortError> {
        outcome.json::<T>().map_err(|e| {
            self.abort(StepAbortError::new(
                outcome.result.name.clone(),
                format!("{e:#}"),
            ))
        })
    }

    /// Record a check that only counts towards the health percentage.
    pub fn record_check(&mut self, check: HealthCheck) {
        self.report.record_check(check);
    }

    /// Record a required check. When it does not hold the scenario fails with `message`, but keeps
    /// running so the remaining steps are still measured.
    pub fn assert_check(&mut self, name: &str, holds: bool, message: impl Into<String>) -> bool {
        self.report.record_check(HealthCheck {
            name: name.to_string(),
            healthy: holds,
            required: true,
            status_code: None,
        });
        if !holds {
            let message = message.into();
            log::warn!("Check [{name}] failed: {message}");
            self.report.push_error(message);
        }
        holds
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl ToString) {
        self.report.tag(key, value);
    }

    pub fn error(&mut self, error: impl Into<String>) {
        self.report.push_error(error);
    }

    /// Mark the run as failed at the current step. Only the first abort is recorded.
    pub fn abort(&mut self, abort: StepAbortError) -> StepAbortError {
        if self.aborted.is_none() {
            log::warn!("{abort}");
            self.report.push_error(abort.to_string());
            self.aborted = Some(abort.clone());
        }
        abort
    }

    /// Settle the run with the result of the scenario hook and seal the report.
    ///
    /// A [StepAbortError] means the target is unhealthy and still completes with a 200. Any other
    /// error is a harness failure and completes with a 500 and whatever was recorded so far.
    pub fn conclude(mut self, outcome: CanaryResult<()>) -> Invocation {
        let status_code = match outcome {
            Ok(()) => InvocationResponse::COMPLETED,
            Err(e) => match e.downcast::<StepAbortError>() {
                Ok(abort) => {
                    self.abort(abort);
                    InvocationResponse::COMPLETED
                }
                Err(e) => {
                    if e.is::<ShutdownSignalError>() {
                        log::info!("Scenario [{}] interrupted", self.report.scenario);
                    } else {
                        log::error!("Scenario [{}] harness error: {e:?}", self.report.scenario);
                    }
                    self.report.push_error(format!("{e:#}"));
                    InvocationResponse::HARNESS_ERROR
                }
            },
        };

        let elapsed = self.started.elapsed();
        let passed = match (status_code, &self.aborted) {
            (InvocationResponse::COMPLETED, None) => self.policy.evaluate(&mut self.report, elapsed),
            // Still measured so aborted reports carry the same tags, the abort is the only error
            (InvocationResponse::COMPLETED, Some(_)) => {
                self.policy.measure(&mut self.report, elapsed);
                false
            }
            _ => false,
        };
        self.report.seal(passed);

        Invocation {
            status_code,
            report: self.report,
        }
    }
}
