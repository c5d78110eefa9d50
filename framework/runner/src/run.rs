use std::sync::Arc;

use anyhow::Context;
use canary_core::prelude::ShutdownSignalError;
use canary_instruments::ReportConfig;
use canary_summary_model::InvocationResponse;

use crate::cli::ReporterOpt;
use crate::emit::ReportEmitter;
use crate::http::HttpStepRunner;
use crate::orchestrator::ScenarioOrchestrator;
use crate::{
    context::{RunnerContext, ScenarioContext, UserValuesConstraint},
    definition::{ScenarioDefinition, ScenarioDefinitionBuilder},
    executor::Executor,
    shutdown::start_shutdown_listener,
    types::CanaryResult,
};

/// What happened across all invocations made by [run].
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub invocations: u64,
    /// Invocations that were unhealthy or did not complete.
    pub failed: u64,
    pub last: Option<InvocationResponse>,
}

impl RunOutcome {
    /// Fail when the most recent invocation was not a healthy, completed one. Use this at the end
    /// of `main` so the exit status reflects the verdict.
    pub fn ensure_success(&self) -> CanaryResult<()> {
        let Some(last) = &self.last else {
            anyhow::bail!("Scenario was never invoked");
        };
        if last.is_harness_error() {
            anyhow::bail!("Scenario did not complete");
        }
        let report = last.report().context("Failed to read back scenario report")?;
        if !report.success {
            anyhow::bail!("Scenario failed: {}", report.errors.join("; "));
        }

        Ok(())
    }
}

pub fn run<V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<V>,
) -> CanaryResult<RunOutcome> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let reporter = Arc::new(
        match definition.config.reporter {
            ReporterOpt::Noop => ReportConfig::default(),
            ReporterOpt::Summary => ReportConfig::default().enable_summary(),
        }
        .init(),
    );
    let http = HttpStepRunner::new(reporter.clone(), definition.config.request_timeout)?;
    let config = Arc::new(definition.config.clone());

    let emitter = ReportEmitter::new(nanoid::nanoid!(), &definition.name, &config);
    log::debug!("Run id: {}", emitter.run_id());

    let runner_context = Arc::new(RunnerContext::new(
        executor,
        http,
        reporter,
        config.clone(),
        shutdown_handle.clone(),
    ));

    // For us to check if we should stop between invocations
    let mut cycle_shutdown_listener = shutdown_handle.new_listener();

    let mut outcome = RunOutcome::default();
    loop {
        outcome.invocations += 1;
        match invoke(&definition, &runner_context, &emitter, outcome.invocations) {
            Ok(response) => {
                let healthy = !response.is_harness_error()
                    && response.report().map(|r| r.success).unwrap_or(false);
                if !healthy {
                    outcome.failed += 1;
                }
                outcome.last = Some(response);
            }
            // A scheduled run outlives a single invocation that could not be emitted
            Err(e) if config.schedule.is_some() => {
                log::error!(
                    "Invocation {} of [{}] could not be emitted: {e:?}",
                    outcome.invocations,
                    definition.name
                );
                outcome.failed += 1;
            }
            Err(e) => return Err(e),
        }

        let Some(schedule) = &config.schedule else {
            break;
        };
        if config
            .max_invocations
            .is_some_and(|max| outcome.invocations >= max)
        {
            log::info!("Completed {} invocations", outcome.invocations);
            break;
        }
        if cycle_shutdown_listener.should_shutdown() {
            break;
        }

        log::info!(
            "Next invocation of [{}] in {}s ({schedule})",
            definition.name,
            schedule.interval().as_secs()
        );
        match runner_context.executor().sleep(schedule.interval()) {
            Ok(()) => {}
            Err(e) if e.is::<ShutdownSignalError>() => break,
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Scenario [{}] finished after {} invocations, {} failed",
        definition.name,
        outcome.invocations,
        outcome.failed
    );

    Ok(outcome)
}

fn invoke<V: UserValuesConstraint>(
    definition: &ScenarioDefinition<V>,
    runner_context: &Arc<RunnerContext>,
    emitter: &ReportEmitter,
    invocation_number: u64,
) -> CanaryResult<InvocationResponse> {
    let orchestrator =
        ScenarioOrchestrator::new(runner_context.http().clone(), definition.policy.clone());
    let mut context = ScenarioContext::<V>::new(
        runner_context.clone(),
        orchestrator.start(&definition.name),
        runner_context.shutdown_handle().new_listener(),
    );

    let result = (definition.scenario_fn)(&mut context);
    let invocation = context.into_run().conclude(result);

    runner_context.reporter().finalize();

    emitter.emit(invocation_number, &invocation)
}
