mod batch;
mod cli;
mod config;
mod context;
mod definition;
mod emit;
mod executor;
mod health;
mod http;
mod init;
mod orchestrator;
mod progress;
mod run;
mod schedule;
mod sequencer;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::batch::ConcurrentBatchRunner;
    pub use crate::cli::{CanaryScenarioCli, CheckProfile, PetSource, ReporterOpt};
    pub use crate::config::{normalize_url, CanaryConfig, ConfigError, ScenarioThresholds};
    pub use crate::context::{RunnerContext, ScenarioContext, UserValuesConstraint};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::emit::ReportEmitter;
    pub use crate::executor::Executor;
    pub use crate::health::{
        HealthAggregator, HealthVerdict, ENDPOINT_HEALTH_THRESHOLD, LOAD_SUCCESS_THRESHOLD,
    };
    pub use crate::http::{
        endpoint, Expect, HttpRequest, HttpResponse, HttpStepRunner, StepOutcome,
        DEFAULT_REQUEST_TIMEOUT,
    };
    pub use crate::init::init;
    pub use crate::orchestrator::{
        Invocation, LatencyCeiling, ScenarioOrchestrator, ScenarioPolicy, ScenarioRun,
    };
    pub use crate::run::{run, RunOutcome};
    pub use crate::schedule::{Schedule, ScheduleError};
    pub use crate::sequencer::{Step, StepSequencer};
    pub use crate::types::CanaryResult;

    pub use canary_core::prelude::*;
    pub use reqwest::Method;
    pub use canary_instruments::{ReportConfig, Reporter};
    pub use canary_summary_model::{
        BatchResult, HealthCheck, HealthCheckSet, InvocationResponse, ScenarioReport,
        ScenarioState, StepResult,
    };
}
