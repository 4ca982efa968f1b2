//! Runtime settings

use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use triarb_core::OptimizerConfig;

pub const ENV_PREFIX: &str = "TRIARB";
pub const DEFAULT_CONFIG_FILE: &str = "triarb";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub optimizer: OptimizerConfig,
    pub log_format: LogFormat,
    /// Scenario used when none is given on the command line
    pub scenario: Option<PathBuf>,
}

impl Settings {
    /// Layer `<file>.{toml,json,...}` (optional) under `TRIARB__*` variables,
    /// e.g. `TRIARB__OPTIMIZER__SOLVE_TIMEOUT_MS=250`.
    pub fn load(file: &str) -> anyhow::Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        settings
            .optimizer
            .validate()
            .context("Invalid optimizer settings")?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load("definitely-missing-triarb-settings").unwrap();
        assert_eq!(settings.optimizer, OptimizerConfig::default());
        assert_eq!(settings.log_format, LogFormat::Text);
    }

    #[test]
    fn test_load_toml_file() {
        let dir = std::env::temp_dir().join(format!("triarb-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triarb.toml");
        std::fs::write(
            &path,
            r#"
log_format = "json"
scenario = "scenarios/default.json"

[optimizer]
materiality_threshold = 0.01
solve_timeout_ms = 250

[optimizer.liquidity]
base_factor = 0.2
"#,
        )
        .unwrap();

        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.scenario, Some(PathBuf::from("scenarios/default.json")));
        assert_eq!(settings.optimizer.materiality_threshold, 0.01);
        assert_eq!(settings.optimizer.solve_timeout_ms, Some(250));
        assert_eq!(settings.optimizer.liquidity.base_factor, 0.2);
        assert_eq!(settings.optimizer.liquidity.fee_multiplier, 10.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rejects_invalid_optimizer_settings() {
        let dir = std::env::temp_dir().join(format!("triarb-bad-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triarb.toml");
        std::fs::write(&path, "[optimizer]\nmateriality_threshold = -1.0\n").unwrap();

        assert!(Settings::load(path.to_str().unwrap()).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
