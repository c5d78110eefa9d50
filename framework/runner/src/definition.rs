use crate::cli::CanaryScenarioCli;
use crate::config::CanaryConfig;
use crate::context::{ScenarioContext, UserValuesConstraint};
use crate::init::init;
use crate::orchestrator::ScenarioPolicy;
use crate::types::CanaryResult;

pub type HookResult = CanaryResult<()>;

pub type ScenarioHookMut<V> = fn(&mut ScenarioContext<V>) -> HookResult;

/// The builder for a scenario definition.
///
/// This must be used at the start of a canary binary to define the scenario that you want to run.
pub struct ScenarioDefinitionBuilder<V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the workspace.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// This value is initialised for you and you cannot change it.
    #[doc(hidden)]
    cli: CanaryScenarioCli,
    /// Thresholds checked once the scenario hook has returned. Can be overridden per scenario in
    /// the config file.
    policy: ScenarioPolicy,
    /// Rate used when `--schedule` is passed without an expression.
    default_schedule: Option<String>,
    /// The scenario itself, called once per invocation.
    scenario_fn: Option<ScenarioHookMut<V>>,
}

pub struct ScenarioDefinition<V: UserValuesConstraint> {
    pub name: String,
    pub config: CanaryConfig,
    pub policy: ScenarioPolicy,
    pub scenario_fn: ScenarioHookMut<V>,
}

impl<V: UserValuesConstraint> ScenarioDefinitionBuilder<V> {
    /// Initialise a new scenario definition from the scenario name and parsed command line arguments.
    /// See the [ScenarioDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: CanaryScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            policy: ScenarioPolicy::default(),
            default_schedule: None,
            scenario_fn: None,
        }
    }

    /// Initialise logging and parse the command line, then create the builder.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, init())
    }

    pub fn with_policy(mut self, policy: ScenarioPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_default_schedule(mut self, expression: &str) -> Self {
        self.default_schedule = Some(expression.to_string());
        self
    }

    /// Set the scenario hook [ScenarioDefinitionBuilder::scenario_fn].
    pub fn use_scenario(mut self, scenario_fn: ScenarioHookMut<V>) -> Self {
        self.scenario_fn = Some(scenario_fn);
        self
    }

    pub(crate) fn build(self) -> CanaryResult<ScenarioDefinition<V>> {
        let scenario_fn = self
            .scenario_fn
            .ok_or_else(|| anyhow::anyhow!("No scenario hook defined for [{}]", self.name))?;
        let config =
            CanaryConfig::from_cli(&self.name, &self.cli, self.default_schedule.as_deref())?;
        let policy = match config.thresholds(&self.name) {
            Some(overrides) => self.policy.apply_overrides(overrides),
            None => self.policy,
        };

        Ok(ScenarioDefinition {
            name: self.name,
            config,
            policy,
            scenario_fn,
        })
    }
}
