use std::time::Duration;
use std::{fmt::Debug, sync::Arc};

use canary_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use canary_instruments::Reporter;
use canary_summary_model::{BatchResult, HealthCheck, ScenarioReport};
use serde::de::DeserializeOwned;

use crate::config::CanaryConfig;
use crate::executor::Executor;
use crate::http::{HttpRequest, HttpStepRunner, StepOutcome};
use crate::orchestrator::ScenarioRun;
use crate::progress::{start_progress, ProgressGuard};
use crate::sequencer::{Step, StepSequencer};
use crate::types::CanaryResult;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

impl UserValuesConstraint for () {}

/// Shared by every invocation made by the runner.
#[derive(Debug)]
pub struct RunnerContext {
    executor: Arc<Executor>,
    http: HttpStepRunner,
    reporter: Arc<Reporter>,
    config: Arc<CanaryConfig>,
    shutdown_handle: ShutdownHandle,
}

impl RunnerContext {
    pub(crate) fn new(
        executor: Arc<Executor>,
        http: HttpStepRunner,
        reporter: Arc<Reporter>,
        config: Arc<CanaryConfig>,
        shutdown_handle: ShutdownHandle,
    ) -> Self {
        Self {
            executor,
            http,
            reporter,
            config,
            shutdown_handle,
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn http(&self) -> &HttpStepRunner {
        &self.http
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    pub fn config(&self) -> &CanaryConfig {
        &self.config
    }

    /// Get a handle to the shutdown signal. Calling `shutdown` on it stops the schedule loop after
    /// the current invocation and cancels any in-flight step.
    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    /// Show a progress bar for a time bounded scenario, unless progress is disabled. The bar is
    /// removed when the returned guard is dropped.
    pub fn start_progress(&self, planned_runtime: Duration) -> Option<ProgressGuard> {
        if self.config.no_progress {
            return None;
        }

        Some(start_progress(
            planned_runtime,
            self.shutdown_handle.new_listener(),
        ))
    }
}

/// What a scenario hook works with during one invocation.
///
/// Each method blocks on the runner's executor, so hooks are plain functions. Required steps return
/// a [canary_core::prelude::StepAbortError] which the hook should propagate with `?`.
pub struct ScenarioContext<V: UserValuesConstraint> {
    runner_context: Arc<RunnerContext>,
    run: ScenarioRun,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<V: UserValuesConstraint> ScenarioContext<V> {
    pub(crate) fn new(
        runner_context: Arc<RunnerContext>,
        run: ScenarioRun,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            runner_context,
            run,
            shutdown_listener,
            value: Default::default(),
        }
    }

    pub(crate) fn into_run(self) -> ScenarioRun {
        self.run
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext> {
        &self.runner_context
    }

    pub fn config(&self) -> &CanaryConfig {
        self.runner_context.config()
    }

    pub fn report(&self) -> &ScenarioReport {
        self.run.report()
    }

    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    /// Run a step whose failure is recorded but does not stop the scenario.
    pub fn step(&mut self, name: &str, request: &HttpRequest) -> CanaryResult<StepOutcome> {
        let executor = self.runner_context.executor().clone();
        let run = &mut self.run;
        executor.execute_in_place(async move { Ok(run.step(name, request).await) })
    }

    /// Run a step the rest of the scenario depends on.
    pub fn required_step(&mut self, name: &str, request: &HttpRequest) -> CanaryResult<StepOutcome> {
        let executor = self.runner_context.executor().clone();
        let run = &mut self.run;
        executor.execute_in_place(async move { Ok(run.required_step(name, request).await?) })
    }

    pub fn batch(
        &mut self,
        name: &str,
        requests: Vec<(String, HttpRequest)>,
        concurrency_cap: Option<usize>,
    ) -> CanaryResult<BatchResult> {
        let executor = self.runner_context.executor().clone();
        let run = &mut self.run;
        executor.execute_in_place(async move {
            Ok(run.batch(name, requests, concurrency_cap).await)
        })
    }

    /// Run fixed steps in order, stopping at the first required step that fails.
    pub fn sequence(&mut self, steps: &[Step]) -> CanaryResult<()> {
        let executor = self.runner_context.executor().clone();
        let run = &mut self.run;
        executor.execute_in_place(async move { Ok(StepSequencer::sequence(run, steps).await?) })
    }

    /// Parse the JSON body of a step. A malformed body fails the scenario.
    pub fn parse_json<T: DeserializeOwned>(&mut self, outcome: &StepOutcome) -> CanaryResult<T> {
        Ok(self.run.parse_json(outcome)?)
    }

    pub fn record_check(&mut self, check: HealthCheck) {
        self.run.record_check(check);
    }

    pub fn assert_check(&mut self, name: &str, holds: bool, message: impl Into<String>) -> bool {
        self.run.assert_check(name, holds, message)
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl ToString) {
        self.run.tag(key, value);
    }

    pub fn error(&mut self, error: impl Into<String>) {
        self.run.error(error);
    }

    /// Pause the scenario. Interrupted by shutdown.
    pub fn sleep(&self, duration: Duration) -> CanaryResult<()> {
        self.runner_context.executor().sleep(duration)
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
