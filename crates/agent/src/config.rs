//! Agent configuration

use anyhow::{Context, Result};
use fleet_lib::{ControlConfig, EngineConfig, TierId};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
///
/// Read from `FLEET_*` environment variables; nested engine keys use a
/// double underscore, e.g. `FLEET_ENGINE__BUDGET_MONTHLY=250`. An optional
/// file named by `FLEET_CONFIG_FILE` is loaded first and overridden by the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_fleet_name")]
    pub fleet_name: String,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between scaling decisions
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Seconds between utilization samples
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// Size of the simulated fleet at startup
    #[serde(default = "default_initial_instances")]
    pub initial_instances: u32,

    #[serde(default)]
    pub initial_tier: TierId,

    /// Decide and log without applying changes
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_fleet_name() -> String {
    "default".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_tick_interval() -> u64 {
    600
}

fn default_sample_interval() -> u64 {
    60
}

fn default_initial_instances() -> u32 {
    1
}

impl AgentConfig {
    /// Load configuration from the optional file and the environment
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("FLEET_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("FLEET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read agent configuration")?;

        let agent: AgentConfig = config
            .try_deserialize()
            .context("Failed to parse agent configuration")?;
        agent.validate()?;
        Ok(agent)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 || self.sample_interval_secs == 0 {
            anyhow::bail!("tick and sample intervals must be at least one second");
        }
        self.engine
            .validate()
            .context("Invalid engine configuration")?;
        Ok(())
    }

    pub fn control(&self) -> ControlConfig {
        ControlConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            sample_interval: Duration::from_secs(self.sample_interval_secs),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AgentConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_json("{}");
        assert_eq!(config.fleet_name, "default");
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.tick_interval_secs, 600);
        assert_eq!(config.sample_interval_secs, 60);
        assert_eq!(config.initial_instances, 1);
        assert_eq!(config.initial_tier.as_str(), "t2.micro");
        assert!(!config.dry_run);
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn test_nested_engine_settings() {
        let config = from_json(
            r#"{"fleet_name": "web", "engine": {"budget_monthly": 120.0, "thresholds": {"cpu_high": 75.0}}}"#,
        );
        assert_eq!(config.fleet_name, "web");
        assert_eq!(config.engine.budget_monthly, Some(120.0));
        assert_eq!(config.engine.thresholds.cpu_high, 75.0);
        assert_eq!(config.engine.thresholds.memory_high, 85.0);
    }

    #[test]
    fn test_load_from_environment() {
        let vars = [
            ("FLEET_FLEET_NAME", "web"),
            ("FLEET_TICK_INTERVAL_SECS", "30"),
            ("FLEET_DRY_RUN", "true"),
            ("FLEET_ENGINE__BUDGET_MONTHLY", "250"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let loaded = AgentConfig::load();
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let config = tokio_test::assert_ok!(loaded);
        assert_eq!(config.fleet_name, "web");
        assert_eq!(config.tick_interval_secs, 30);
        assert!(config.dry_run);
        assert_eq!(config.engine.budget_monthly, Some(250.0));
        assert_eq!(config.sample_interval_secs, 60);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = from_json(r#"{"tick_interval_secs": 0}"#);
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_control_intervals() {
        let control = from_json(r#"{"tick_interval_secs": 30, "sample_interval_secs": 5}"#).control();
        assert_eq!(control.tick_interval, Duration::from_secs(30));
        assert_eq!(control.sample_interval, Duration::from_secs(5));
    }
}
