use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct CanaryScenarioCli {
    /// Base URL of the PetSite web front end
    #[clap(long, env = "PET_SITE_URL")]
    pub site_url: Option<String>,

    /// URL of the pet search API that returns the full list of pets
    #[clap(long, env = "SEARCH_API_URL")]
    pub search_api_url: Option<String>,

    /// Multiplier for the pause between traffic generator cycles. Each unit is 20 seconds.
    #[clap(long, env = "TRAFFIC_DELAY_TIME")]
    pub traffic_delay: Option<u64>,

    /// Where the adoption workflow gets the pet it adopts
    #[clap(long, value_enum, env = "PET_SOURCE", default_value_t = PetSource::Fixed)]
    pub pet_source: PetSource,

    /// How much of the site the adoption workflow and search API scenarios exercise
    #[clap(long, value_enum, env = "CANARY_PROFILE", default_value_t = CheckProfile::Full)]
    pub profile: CheckProfile,

    /// Re-invoke the scenario on a fixed rate, e.g. `rate(5 minutes)`.
    ///
    /// Passing the flag without a value uses the scenario's own default rate. Without this flag the
    /// scenario is invoked once.
    #[clap(long, num_args = 0..=1)]
    pub schedule: Option<Option<String>>,

    /// Stop after this many scheduled invocations
    #[clap(long)]
    pub invocations: Option<u64>,

    /// Address that alarm notifications go to. Recorded with each run summary.
    #[clap(long)]
    pub notification_email: Option<String>,

    /// Timeout for each HTTP request, in milliseconds
    #[clap(long, default_value_t = 15_000)]
    pub request_timeout_ms: u64,

    /// How long to wait for writes to propagate before verifying them, in milliseconds
    #[clap(long, default_value_t = 1_000)]
    pub settle_delay_ms: u64,

    /// Upper bound on the run time of long running scenarios, in seconds
    #[clap(long)]
    pub max_run_time_s: Option<u64>,

    /// Append a summary line for each invocation to this JSONL file
    #[clap(long)]
    pub run_summary: Option<PathBuf>,

    /// TOML file with target URLs, schedule and per-scenario threshold overrides.
    ///
    /// Values given on the command line or through the environment take precedence.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// How step timings should be reported at the end of each invocation
    #[clap(long, value_enum, default_value_t = ReporterOpt::Summary)]
    pub reporter: ReporterOpt,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

impl Default for CanaryScenarioCli {
    fn default() -> Self {
        Self {
            site_url: None,
            search_api_url: None,
            traffic_delay: None,
            pet_source: PetSource::Fixed,
            profile: CheckProfile::Full,
            schedule: None,
            invocations: None,
            notification_email: None,
            request_timeout_ms: 15_000,
            settle_delay_ms: 1_000,
            max_run_time_s: None,
            run_summary: None,
            config: None,
            reporter: ReporterOpt::Summary,
            no_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PetSource {
    /// Always adopt the configured test pet
    #[default]
    Fixed,
    /// Load pets from the search API and adopt one at random
    SearchApi,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CheckProfile {
    /// Adopt and pay for a pet, validate search results
    #[default]
    Full,
    /// Only check that pages and endpoints respond. Nothing is written to the site.
    Pages,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Discard step timings
    Noop,
    /// Print a table of step timings to stdout
    #[default]
    Summary,
}
