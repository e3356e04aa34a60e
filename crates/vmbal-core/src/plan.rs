//! Output schema for a solved (or unsolvable) rebalancing problem.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{ClusterId, HostId, VmId};

/// Outcome category reported by a solver engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    /// A feasible solution was found but not proven optimal.
    Feasible,
    Infeasible,
    Unbounded,
    #[serde(rename = "Not Solved")]
    NotSolved,
}

impl SolveStatus {
    /// Whether this status comes with variable values.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    pub fn label(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Feasible => "Feasible",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::NotSolved => "Not Solved",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single VM → host decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub vm: VmId,
    pub host: HostId,
}

/// The rebalancing result in domain terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub status: SolveStatus,
    /// Objective value; `None` when no feasible solution exists.
    pub objective: Option<f64>,
    pub assignment: Vec<Placement>,
    pub host_util: IndexMap<HostId, f64>,
    #[serde(rename = "U_max")]
    pub u_max: Option<f64>,
    #[serde(rename = "U_min")]
    pub u_min: Option<f64>,
    pub migration: IndexMap<VmId, u8>,
    pub soft_violation: IndexMap<ClusterId, f64>,
}

impl RebalancePlan {
    /// A plan carrying only a status, for outcomes without a solution.
    pub fn unsolved(status: SolveStatus) -> Self {
        Self {
            status,
            objective: None,
            assignment: Vec::new(),
            host_util: IndexMap::new(),
            u_max: None,
            u_min: None,
            migration: IndexMap::new(),
            soft_violation: IndexMap::new(),
        }
    }

    pub fn is_solved(&self) -> bool {
        self.status.has_solution()
    }

    /// Number of VMs flagged as migrated.
    pub fn migration_count(&self) -> usize {
        self.migration.values().filter(|m| **m == 1).count()
    }

    /// Host assigned to `vm`, if the plan has one.
    pub fn host_of(&self, vm: &str) -> Option<&str> {
        self.assignment
            .iter()
            .find(|p| p.vm == vm)
            .map(|p| p.host.as_str())
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    pub fn from_json_str(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}
