use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::cli::{CanaryScenarioCli, CheckProfile, PetSource, ReporterOpt};
use crate::schedule::{Schedule, ScheduleError};

/// Delay multiplier used by the traffic generator when none is configured.
pub const DEFAULT_TRAFFIC_DELAY: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PET_SITE_URL is required")]
    MissingSiteUrl,
    #[error("SEARCH_API_URL is required")]
    MissingSearchApiUrl,
    #[error("Invalid URL [{value}]: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("Scenario [{0}] has no default schedule, pass a rate expression to --schedule")]
    NoDefaultSchedule(String),
}

/// Overrides for the built in thresholds of one scenario.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioThresholds {
    pub max_response_time_ms: Option<u64>,
    pub health_threshold: Option<f64>,
    pub success_rate_floor: Option<f64>,
}

/// Layout of the optional TOML config file.
///
/// ```toml
/// site_url = "http://petsite.example.com"
/// search_api_url = "http://search.example.com/api/search"
/// schedule = "rate(5 minutes)"
///
/// [scenarios.adoption_workflow]
/// max_response_time_ms = 4000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub site_url: Option<String>,
    pub search_api_url: Option<String>,
    pub traffic_delay: Option<u64>,
    pub schedule: Option<String>,
    pub notification_email: Option<String>,
    pub scenarios: HashMap<String, ScenarioThresholds>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything a scenario needs to know about its target and how to run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct CanaryConfig {
    pub site_url: Option<Url>,
    pub search_api_url: Option<Url>,
    pub traffic_delay: u64,
    pub pet_source: PetSource,
    pub profile: CheckProfile,
    pub request_timeout: Duration,
    pub settle_delay: Duration,
    pub max_run_time: Option<Duration>,
    pub schedule: Option<Schedule>,
    pub max_invocations: Option<u64>,
    pub notification_email: Option<String>,
    pub run_summary_path: Option<PathBuf>,
    pub reporter: ReporterOpt,
    pub no_progress: bool,
    thresholds: HashMap<String, ScenarioThresholds>,
}

impl CanaryConfig {
    /// Resolve the configuration for `scenario` from the command line and the optional config file.
    pub fn from_cli(
        scenario: &str,
        cli: &CanaryScenarioCli,
        default_schedule: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let site_url = cli
            .site_url
            .as_deref()
            .or(file.site_url.as_deref())
            .map(normalize_url)
            .transpose()?;
        let search_api_url = cli
            .search_api_url
            .as_deref()
            .or(file.search_api_url.as_deref())
            .map(normalize_url)
            .transpose()?;

        let schedule = match &cli.schedule {
            Some(Some(expression)) => Some(expression.parse::<Schedule>()?),
            Some(None) => match default_schedule.or(file.schedule.as_deref()) {
                Some(expression) => Some(expression.parse::<Schedule>()?),
                None => return Err(ConfigError::NoDefaultSchedule(scenario.to_string())),
            },
            None => file
                .schedule
                .as_deref()
                .map(str::parse::<Schedule>)
                .transpose()?,
        };

        Ok(Self {
            site_url,
            search_api_url,
            traffic_delay: cli
                .traffic_delay
                .or(file.traffic_delay)
                .unwrap_or(DEFAULT_TRAFFIC_DELAY),
            pet_source: cli.pet_source,
            profile: cli.profile,
            request_timeout: Duration::from_millis(cli.request_timeout_ms),
            settle_delay: Duration::from_millis(cli.settle_delay_ms),
            max_run_time: cli.max_run_time_s.map(Duration::from_secs),
            schedule,
            max_invocations: cli.invocations,
            notification_email: cli
                .notification_email
                .clone()
                .or(file.notification_email),
            run_summary_path: cli.run_summary.clone(),
            reporter: cli.reporter,
            no_progress: cli.no_progress,
            thresholds: file.scenarios,
        })
    }

    pub fn site_url(&self) -> Result<&Url, ConfigError> {
        self.site_url.as_ref().ok_or(ConfigError::MissingSiteUrl)
    }

    pub fn search_api_url(&self) -> Result<&Url, ConfigError> {
        self.search_api_url
            .as_ref()
            .ok_or(ConfigError::MissingSearchApiUrl)
    }

    pub fn thresholds(&self, scenario: &str) -> Option<&ScenarioThresholds> {
        self.thresholds.get(scenario)
    }

    /// Pause between traffic generator cycles.
    pub fn traffic_cycle_delay(&self) -> Duration {
        Duration::from_secs(self.traffic_delay.saturating_mul(20))
    }

    /// The values that identify what is being probed, recorded with each run summary.
    pub fn env_summary(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(url) = &self.site_url {
            env.push(("site_url".to_string(), url.to_string()));
        }
        if let Some(url) = &self.search_api_url {
            env.push(("search_api_url".to_string(), url.to_string()));
        }
        if let Some(email) = &self.notification_email {
            env.push(("notification_email".to_string(), email.clone()));
        }
        env
    }
}

/// Accept URLs the way they are usually pasted into canary configuration: surrounding whitespace and
/// a trailing `?` are dropped and `http://` is assumed when there is no scheme.
pub fn normalize_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('?').unwrap_or(trimmed);
    let candidate = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    Url::parse(&candidate).map_err(|source| ConfigError::InvalidUrl {
        value: raw.to_string(),
        source,
    })
}
