//! vmbal-core — domain types for VM rebalancing.
//!
//! Turns loosely-typed caller input into a validated [`RebalanceProblem`]
//! and defines the [`RebalancePlan`] output schema that solvers report in.
//!
//! # Components
//!
//! - **`input`** — raw input schema with field aliases
//! - **`normalize`** — `SpecNormalizer`, raw input to canonical problem
//! - **`types`** — hosts, VMs, clusters, weights, the canonical problem
//! - **`plan`** — output schema and solve status
//! - **`audit`** — re-check a plan against its problem
//! - **`config`** — `vmbal.toml` parsing

pub mod audit;
pub mod config;
pub mod error;
pub mod input;
pub mod normalize;
pub mod plan;
pub mod types;

pub use audit::{AuditFinding, audit};
pub use config::{OutputFormat, VmbalConfig};
pub use error::{ConfigError, EntityKind, ValidationError, ValidationResult};
pub use input::RawSpec;
pub use normalize::SpecNormalizer;
pub use plan::{Placement, RebalancePlan, SolveStatus};
pub use types::*;
