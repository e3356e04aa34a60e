//! Loose input schema as callers send it.
//!
//! Field aliases (`cpu_cap` / `cpu_capacity`, `alpha` / `alpha_balance`, ...)
//! are resolved here by serde. Everything is optional at this layer so the
//! normalizer can report missing fields with entity context instead of a
//! bare serde message.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSpec {
    #[serde(default)]
    pub hosts: Vec<RawHost>,
    #[serde(default)]
    pub vms: Vec<RawVm>,
    /// Host id → VM ids currently running there.
    #[serde(default)]
    pub initial_placement: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub clusters: Vec<RawCluster>,
    #[serde(default)]
    pub weights: Option<RawWeights>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHost {
    pub id: Option<String>,
    #[serde(alias = "cpu_cap")]
    pub cpu_capacity: Option<f64>,
    #[serde(alias = "mem_cap")]
    pub mem_capacity: Option<f64>,
    pub oc_cpu: Option<f64>,
    pub oc_mem: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawVm {
    pub id: Option<String>,
    pub cpu: Option<f64>,
    pub mem: Option<f64>,
    #[serde(default)]
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCluster {
    pub id: Option<String>,
    /// Any JSON number; must turn out integral.
    pub size: Option<f64>,
    #[serde(default)]
    pub hard_excl: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWeights {
    #[serde(alias = "alpha_balance")]
    pub alpha: Option<f64>,
    #[serde(alias = "beta_migration")]
    pub beta: Option<f64>,
    #[serde(alias = "gamma_soft")]
    pub gamma: Option<f64>,
}

impl RawSpec {
    pub fn from_json_str(input: &str) -> ValidationResult<Self> {
        serde_json::from_str(input).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    pub fn from_json_value(value: serde_json::Value) -> ValidationResult<Self> {
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}
