mod report;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

pub use report::{
    BatchResult, HealthCheck, HealthCheckSet, InvocationResponse, ScenarioReport, ScenarioState,
    StepResult,
};

/// Summary of one scenario invocation, written to the run summary history file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner when the process starts. Every scheduled invocation made by the same
    /// process shares it.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// Sequence number of this invocation within the run, starting at 1
    pub invocation: u64,
    /// The time the invocation started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The schedule expression the runner was configured with, if any
    pub schedule: Option<String>,
    /// Configuration the runner was given
    ///
    /// Target URLs and anything else that identifies what was being probed.
    pub env: HashMap<String, String>,
    /// Status code returned across the invocation boundary
    pub status_code: u16,
    /// The verdict from the sealed report
    pub success: bool,
    /// The version of the canary engine that ran the scenario
    pub canary_version: String,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        scenario_name: String,
        invocation: u64,
        started_at: i64,
        schedule: Option<String>,
        canary_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            invocation,
            started_at,
            schedule,
            env: HashMap::with_capacity(0),
            status_code: InvocationResponse::COMPLETED,
            success: false,
            canary_version,
        }
    }

    /// Add an environment value
    pub fn add_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Record the outcome of the invocation
    pub fn set_outcome(&mut self, status_code: u16, success: bool) {
        self.status_code = status_code;
        self.success = success;
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint identifies the configuration used to run the scenario, so that history for
    /// the same canary against the same target can be grouped. It uses the
    ///     - Scenario name
    ///     - Schedule
    ///     - Environment values
    ///     - Canary version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());
        if let Some(schedule) = &self.schedule {
            Digest::update(&mut hasher, schedule.as_bytes());
        }
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.canary_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are skipped.
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
