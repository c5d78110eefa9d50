/// Return this error from a scenario hook to indicate that a required step failed.
///
/// The scenario stops at the step that failed, the report is sealed with `success: false` and the
/// invocation still completes with a 200 status. The target is unhealthy but the harness did its
/// job. Any other error returned from a hook is treated as a harness failure and reported as a 500.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("Required step [{step}] failed: {reason}")]
pub struct StepAbortError {
    step: String,
    reason: String,
}

impl StepAbortError {
    pub fn new(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// The name of the step that aborted the scenario.
    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
