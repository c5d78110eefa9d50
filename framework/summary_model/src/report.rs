use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single HTTP step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub name: String,
    /// Absent when no response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub success: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    /// A step that received a response. `success` is decided by the caller's status expectation.
    pub fn completed(name: impl Into<String>, status_code: u16, success: bool, latency_ms: u64) -> Self {
        Self {
            name: name.into(),
            status_code: Some(status_code),
            success,
            latency_ms,
            error: (!success).then(|| format!("unexpected status {status_code}")),
        }
    }

    /// A step that never received a response.
    pub fn transport_failure(
        name: impl Into<String>,
        latency_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status_code: None,
            success: false,
            latency_ms,
            error: Some(error.into()),
        }
    }

    /// Human readable reason for a failed step, in the form it is written to the report errors.
    pub fn failure_reason(&self) -> String {
        match (self.status_code, &self.error) {
            (Some(status), _) => format!("status {status}"),
            (None, Some(error)) => error.clone(),
            (None, None) => "unknown failure".to_string(),
        }
    }
}

/// Aggregate of a set of concurrently executed requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    /// Wall clock time from launching the first request until the last one settled.
    pub total_latency_ms: u64,
    pub per_request_results: Vec<StepResult>,
}

impl BatchResult {
    pub fn from_results(per_request_results: Vec<StepResult>, total_latency_ms: u64) -> Self {
        let success_count = per_request_results.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: per_request_results.len() - success_count,
            total_latency_ms,
            per_request_results,
        }
    }

    pub fn total_requests(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// A named boolean health check.
///
/// Required checks fail the scenario on their own. Other checks only count towards the health
/// percentage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HealthCheckSet {
    checks: Vec<HealthCheck>,
}

impl HealthCheckSet {
    /// Insert a check, replacing any existing check with the same name.
    pub fn insert(&mut self, check: HealthCheck) {
        match self.checks.iter_mut().find(|c| c.name == check.name) {
            Some(existing) => *existing = check,
            None => self.checks.push(check),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HealthCheck> {
        self.checks.iter()
    }

    pub fn healthy_count(&self) -> usize {
        self.checks.iter().filter(|c| c.healthy).count()
    }

    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// `healthy / total * 100`. An empty set is 0% healthy.
    pub fn health_percentage(&self) -> f64 {
        if self.checks.is_empty() {
            return 0.0;
        }
        self.healthy_count() as f64 / self.total_count() as f64 * 100.0
    }
}

impl FromIterator<HealthCheck> for HealthCheckSet {
    fn from_iter<T: IntoIterator<Item = HealthCheck>>(iter: T) -> Self {
        let mut set = Self::default();
        for check in iter {
            set.insert(check);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioState {
    #[default]
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScenarioState::Succeeded | ScenarioState::Failed)
    }
}

/// The structured result of one scenario invocation.
///
/// Built up while the scenario runs and sealed exactly once at the end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub scenario: String,
    pub state: ScenarioState,
    pub success: bool,
    pub errors: Vec<String>,
    pub step_results: BTreeMap<String, StepResult>,
    #[serde(default, skip_serializing_if = "HealthCheckSet::is_empty")]
    pub checks: HealthCheckSet,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub batches: BTreeMap<String, BatchResult>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_latency_ms: u64,
    pub tags: BTreeMap<String, String>,
}

impl ScenarioReport {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            state: ScenarioState::NotStarted,
            success: false,
            errors: Vec::new(),
            step_results: BTreeMap::new(),
            checks: HealthCheckSet::default(),
            batches: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            total_latency_ms: 0,
            tags: BTreeMap::new(),
        }
    }

    pub fn start(&mut self) {
        self.state = ScenarioState::Running;
        self.started_at = Utc::now();
    }

    /// Record a step result. A step with the same name replaces the earlier result.
    pub fn record_step(&mut self, result: StepResult) {
        self.step_results.insert(result.name.clone(), result);
    }

    pub fn record_batch(&mut self, name: impl Into<String>, batch: BatchResult) {
        self.batches.insert(name.into(), batch);
    }

    pub fn record_check(&mut self, check: HealthCheck) {
        self.checks.insert(check);
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl ToString) {
        self.tags.insert(key.into(), value.to_string());
    }

    /// Every latency recorded in this report, sequential steps first then batch requests.
    pub fn latencies(&self) -> impl Iterator<Item = u64> + '_ {
        self.step_results.values().map(|r| r.latency_ms).chain(
            self.batches
                .values()
                .flat_map(|b| b.per_request_results.iter().map(|r| r.latency_ms)),
        )
    }

    /// Count of `(succeeded, total)` over steps and batch requests.
    pub fn request_counts(&self) -> (usize, usize) {
        let steps_ok = self.step_results.values().filter(|r| r.success).count();
        let batch_ok = self.batches.values().map(|b| b.success_count).sum::<usize>();
        let batch_total = self.batches.values().map(|b| b.total_requests()).sum::<usize>();

        (steps_ok + batch_ok, self.step_results.len() + batch_total)
    }

    pub fn is_sealed(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Stamp the report with its verdict and end time. Has no effect on an already sealed report.
    pub fn seal(&mut self, success: bool) {
        if self.is_sealed() {
            return;
        }

        let finished_at = Utc::now();
        self.success = success;
        self.state = if success {
            ScenarioState::Succeeded
        } else {
            ScenarioState::Failed
        };
        self.total_latency_ms = (finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.finished_at = Some(finished_at);
    }
}

/// What a scenario hands back across the invocation boundary.
///
/// `status_code` is 200 when the harness completed, whatever the verdict, and 500 when the harness
/// itself failed. The body is always the serialized report, partial or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub const COMPLETED: u16 = 200;
    pub const HARNESS_ERROR: u16 = 500;

    pub fn from_report(status_code: u16, report: &ScenarioReport) -> serde_json::Result<Self> {
        Ok(Self {
            status_code,
            body: serde_json::to_string_pretty(report)?,
        })
    }

    pub fn report(&self) -> serde_json::Result<ScenarioReport> {
        serde_json::from_str(&self.body)
    }

    pub fn is_harness_error(&self) -> bool {
        self.status_code == Self::HARNESS_ERROR
    }
}
