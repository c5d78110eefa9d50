use canary_core::prelude::StepAbortError;
use canary_summary_model::ScenarioReport;

use crate::http::HttpRequest;
use crate::orchestrator::{ScenarioOrchestrator, ScenarioRun};

/// A named step in a fixed sequence.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub request: HttpRequest,
    /// A required step that fails stops the sequence.
    pub required: bool,
}

impl Step {
    pub fn required(name: impl Into<String>, request: HttpRequest) -> Self {
        Self {
            name: name.into(),
            request,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, request: HttpRequest) -> Self {
        Self {
            name: name.into(),
            request,
            required: false,
        }
    }
}

/// Runs steps strictly in order.
///
/// Flows where a request depends on an earlier response use [ScenarioRun::step] and
/// [ScenarioRun::required_step] directly.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    orchestrator: ScenarioOrchestrator,
}

impl StepSequencer {
    pub fn new(orchestrator: ScenarioOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run `steps` as a complete scenario and return the sealed report.
    pub async fn run(&self, scenario: &str, steps: &[Step]) -> ScenarioReport {
        let mut run = self.orchestrator.start(scenario);
        let outcome = Self::sequence(&mut run, steps).await;
        run.conclude(outcome.map_err(anyhow::Error::from)).report
    }

    /// Run `steps` as part of a larger run. Stops at the first required step that fails.
    pub async fn sequence(run: &mut ScenarioRun, steps: &[Step]) -> Result<(), StepAbortError> {
        for step in steps {
            if step.required {
                run.required_step(&step.name, &step.request).await?;
            } else {
                run.step(&step.name, &step.request).await;
            }
        }

        Ok(())
    }
}
