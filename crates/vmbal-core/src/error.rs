//! Error types for input validation and configuration.

use std::fmt;

use thiserror::Error;

/// Result type alias for normalization.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Host,
    Vm,
    Cluster,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Host => "host",
            EntityKind::Vm => "vm",
            EntityKind::Cluster => "cluster",
        };
        f.write_str(s)
    }
}

/// Errors raised while normalizing a rebalancing input.
///
/// All of these are raised before any model variable exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("{kind} #{index} has no id")]
    MissingId { kind: EntityKind, index: usize },

    #[error("{kind} id {id:?} is not a valid identifier")]
    MalformedId { kind: EntityKind, id: String },

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("{kind} {id} is missing required field `{field}`")]
    MissingField {
        kind: EntityKind,
        id: String,
        field: &'static str,
    },

    #[error("{kind} {id} has invalid `{field}`: {value} (must be finite and non-negative)")]
    InvalidNumber {
        kind: EntityKind,
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("cluster {cluster} has invalid `size`: {value} (must be a non-negative integer)")]
    InvalidSize { cluster: String, value: f64 },

    #[error("invalid weight `{name}`: {value} (must be finite and non-negative)")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("initial placement references unknown host: {0}")]
    UnknownHost(String),

    #[error("initial placement on host {host} references unknown vm: {vm}")]
    UnknownVm { host: String, vm: String },

    #[error("vm {vm} references unknown cluster: {cluster}")]
    UnknownCluster { vm: String, cluster: String },

    #[error("vm {vm} is placed on both {first} and {second}")]
    DuplicatePlacement {
        vm: String,
        first: String,
        second: String,
    },
}

/// Errors raised while loading `vmbal.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
