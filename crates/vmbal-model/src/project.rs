//! Result projector — solved variable values back to a [`RebalancePlan`].

use indexmap::IndexMap;
use tracing::debug;

use vmbal_core::{Placement, RebalancePlan, RebalanceProblem};

use crate::builder::BuiltModel;
use crate::engine::EngineOutcome;
use crate::error::ProjectionError;
use crate::model::VarId;

/// Binary values above this count as set.
const SELECTED: f64 = 0.5;

pub struct ResultProjector<'a> {
    problem: &'a RebalanceProblem,
    built: &'a BuiltModel,
}

impl<'a> ResultProjector<'a> {
    pub fn new(problem: &'a RebalanceProblem, built: &'a BuiltModel) -> Self {
        Self { problem, built }
    }

    pub fn project(&self, outcome: &EngineOutcome) -> Result<RebalancePlan, ProjectionError> {
        if !outcome.status.has_solution() {
            debug!(status = %outcome.status, detail = ?outcome.detail, "no solution to project");
            return Ok(RebalancePlan::unsolved(outcome.status));
        }
        let solution = outcome
            .solution
            .as_ref()
            .ok_or(ProjectionError::MissingSolution(outcome.status))?;

        let values = &solution.values;
        let expected = self.built.model.vars().len();
        if values.len() != expected {
            return Err(ProjectionError::ValueCount {
                expected,
                got: values.len(),
            });
        }

        let p = self.problem;
        let vars = &self.built.vars;
        let value = |v: VarId| values[v.index()];

        // First host above the threshold wins; the assignment constraint
        // makes a second one impossible in a valid solution.
        let assignment = p
            .vms()
            .iter()
            .enumerate()
            .map(|(vi, vm)| {
                let hi = vars.x[vi]
                    .iter()
                    .position(|&x| value(x) > SELECTED)
                    .ok_or_else(|| ProjectionError::UnassignedVm(vm.id.clone()))?;
                Ok(Placement {
                    vm: vm.id.clone(),
                    host: p.hosts()[hi].id.clone(),
                })
            })
            .collect::<Result<Vec<_>, ProjectionError>>()?;

        let host_util: IndexMap<String, f64> = p
            .hosts()
            .iter()
            .zip(&vars.util)
            .map(|(h, &u)| (h.id.clone(), value(u)))
            .collect();

        let migration: IndexMap<String, u8> = p
            .vms()
            .iter()
            .zip(&vars.m)
            .map(|(vm, &m)| (vm.id.clone(), u8::from(value(m).round() >= 1.0)))
            .collect();

        let soft_violation: IndexMap<String, f64> = p
            .clusters()
            .iter()
            .enumerate()
            .map(|(ci, c)| {
                let s = if p.members(ci).is_empty() {
                    0.0
                } else {
                    value(vars.s[ci])
                };
                (c.id.clone(), s)
            })
            .collect();

        Ok(RebalancePlan {
            status: outcome.status,
            objective: Some(solution.objective),
            assignment,
            host_util,
            u_max: Some(value(vars.u_max)),
            u_min: Some(value(vars.u_min)),
            migration,
            soft_violation,
        })
    }
}
