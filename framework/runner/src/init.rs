use crate::cli::CanaryScenarioCli;
use clap::Parser;

/// Initialise the CLI and logging for the canary runner.
pub fn init() -> CanaryScenarioCli {
    env_logger::init();

    CanaryScenarioCli::parse()
}
