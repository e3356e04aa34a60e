//! Objective composer — weighted balance, migration and soft-violation terms.

use vmbal_core::Weights;

use crate::builder::DecisionVars;
use crate::model::LinearExpr;

/// Builds `alpha * (U_max - U_min) + beta * Σ m[v] + gamma * Σ s[c]`.
pub struct ObjectiveComposer {
    weights: Weights,
}

impl ObjectiveComposer {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn compose(&self, vars: &DecisionVars) -> LinearExpr {
        let Weights { alpha, beta, gamma } = self.weights;

        let mut objective = LinearExpr::new()
            .with(vars.u_max, alpha)
            .with(vars.u_min, -alpha);
        objective.extend(vars.m.iter().map(|&m| (m, beta)));
        if !vars.s.is_empty() {
            objective.extend(vars.s.iter().map(|&s| (s, gamma)));
        }
        objective
    }
}
