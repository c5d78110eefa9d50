use std::path::PathBuf;

use anyhow::Context;
use canary_summary_model::{append_run_summary, InvocationResponse, RunSummary};

use crate::config::CanaryConfig;
use crate::orchestrator::Invocation;
use crate::types::CanaryResult;

/// Hands a concluded invocation across the invocation boundary.
///
/// The response is printed to stdout as JSON and, when a history file is configured, a
/// [RunSummary] line is appended for it.
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    run_id: String,
    scenario_name: String,
    schedule: Option<String>,
    env: Vec<(String, String)>,
    run_summary_path: Option<PathBuf>,
}

impl ReportEmitter {
    pub fn new(run_id: String, scenario_name: &str, config: &CanaryConfig) -> Self {
        Self {
            run_id,
            scenario_name: scenario_name.to_string(),
            schedule: config.schedule.as_ref().map(|s| s.to_string()),
            env: config.env_summary(),
            run_summary_path: config.run_summary_path.clone(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Serialize the sealed report into the `{statusCode, body}` response.
    pub fn to_response(invocation: &Invocation) -> CanaryResult<InvocationResponse> {
        InvocationResponse::from_report(invocation.status_code, &invocation.report)
            .context("Failed to serialize scenario report")
    }

    pub fn emit(&self, invocation_number: u64, invocation: &Invocation) -> CanaryResult<InvocationResponse> {
        let response = Self::to_response(invocation)?;
        let report = &invocation.report;

        if response.is_harness_error() {
            log::error!(
                "Invocation {invocation_number} of [{}] did not complete: {}",
                self.scenario_name,
                report.errors.join("; ")
            );
        } else if report.success {
            log::info!(
                "Invocation {invocation_number} of [{}] succeeded in {}ms",
                self.scenario_name,
                report.total_latency_ms
            );
        } else {
            log::warn!(
                "Invocation {invocation_number} of [{}] failed: {}",
                self.scenario_name,
                report.errors.join("; ")
            );
        }

        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialize response")?
        );

        if let Some(path) = &self.run_summary_path {
            let mut summary = RunSummary::new(
                self.run_id.clone(),
                self.scenario_name.clone(),
                invocation_number,
                report.started_at.timestamp(),
                self.schedule.clone(),
                env!("CARGO_PKG_VERSION").to_string(),
            );
            for (key, value) in &self.env {
                summary.add_env(key, value);
            }
            summary.set_outcome(response.status_code, report.success);

            append_run_summary(&summary, path).with_context(|| {
                format!("Failed to append run summary to {}", path.display())
            })?;
            log::debug!(
                "Appended run summary with fingerprint {}",
                summary.fingerprint()
            );
        }

        Ok(response)
    }
}
