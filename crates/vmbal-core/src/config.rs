//! vmbal.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Weights;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VmbalConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    /// Fallback weights for inputs that omit them.
    pub weights: Option<WeightsConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// Wall-clock limit for a single solve, in seconds.
    pub time_limit_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            pretty: default_pretty(),
        }
    }
}

fn default_pretty() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(ConfigError::Invalid(format!("unknown output format: {other}"))),
        }
    }
}

impl VmbalConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: VmbalConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config with every section spelled out.
    pub fn scaffold() -> Self {
        let w = Weights::default();
        VmbalConfig {
            solver: SolverConfig {
                time_limit_secs: Some(60.0),
            },
            weights: Some(WeightsConfig {
                alpha: Some(w.alpha),
                beta: Some(w.beta),
                gamma: Some(w.gamma),
            }),
            output: OutputConfig::default(),
        }
    }

    /// Weights to fall back on, layered over the built-in defaults.
    pub fn default_weights(&self) -> Weights {
        let d = Weights::default();
        match &self.weights {
            Some(w) => Weights {
                alpha: w.alpha.unwrap_or(d.alpha),
                beta: w.beta.unwrap_or(d.beta),
                gamma: w.gamma.unwrap_or(d.gamma),
            },
            None => d,
        }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.solver.time_limit_secs.map(Duration::from_secs_f64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secs) = self.solver.time_limit_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "solver.time_limit_secs must be positive, got {secs}"
                )));
            }
        }
        let w = self.default_weights();
        for (name, value) in [("alpha", w.alpha), ("beta", w.beta), ("gamma", w.gamma)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "weights.{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}
