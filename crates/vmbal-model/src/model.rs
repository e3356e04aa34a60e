//! Solver-agnostic mixed-integer linear model.
//!
//! The builder writes into a [`Model`]; a [`SolverEngine`](crate::engine::SolverEngine)
//! reads it. Nothing here knows about hosts or VMs.

use std::collections::HashMap;
use std::fmt;

/// Handle to a variable inside one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in [`Model::vars`].
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Integer in `{0, 1}`.
    Binary,
    Continuous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    /// `f64::INFINITY` when unbounded above.
    pub upper: f64,
}

/// A sum of `coefficient * variable` terms.
///
/// Each variable appears at most once and zero coefficients are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    /// Position of each variable in `terms`.
    index: HashMap<VarId, usize>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, var: VarId, coeff: f64) -> Self {
        self.add(var, coeff);
        self
    }

    /// Add `coeff * var`, merging with an existing term for `var`.
    pub fn add(&mut self, var: VarId, coeff: f64) {
        match self.index.get(&var).copied() {
            Some(pos) => {
                self.terms[pos].1 += coeff;
                if self.terms[pos].1 == 0.0 {
                    self.index.remove(&var);
                    self.terms.swap_remove(pos);
                    if let Some((moved, _)) = self.terms.get(pos) {
                        self.index.insert(*moved, pos);
                    }
                }
            }
            None if coeff != 0.0 => {
                self.index.insert(var, self.terms.len());
                self.terms.push((var, coeff));
            }
            None => {}
        }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coeff(&self, var: VarId) -> f64 {
        self.index.get(&var).map_or(0.0, |&pos| self.terms[pos].1)
    }

    /// Value of the expression under `values`, indexed by [`VarId::index`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum()
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        let mut expr = LinearExpr::new();
        expr.extend(iter);
        expr
    }
}

impl Extend<(VarId, f64)> for LinearExpr {
    fn extend<I: IntoIterator<Item = (VarId, f64)>>(&mut self, iter: I) {
        for (var, coeff) in iter {
            self.add(var, coeff);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

impl Relation {
    /// Whether `lhs <relation> rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Relation::Eq => (lhs - rhs).abs() <= tolerance,
            Relation::Le => lhs <= rhs + tolerance,
            Relation::Ge => lhs + tolerance >= rhs,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::Eq => "=",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        })
    }
}

/// `expr <relation> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.relation
            .holds(self.expr.evaluate(values), self.rhs, tolerance)
    }
}

/// Size summary of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStats {
    pub variables: usize,
    pub binaries: usize,
    pub constraints: usize,
}

/// Variables, constraints and a minimization objective.
#[derive(Debug, Clone, Default)]
pub struct Model {
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(VarDef {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        })
    }

    /// Continuous variable in `[lower, upper]`.
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_var(VarDef {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        })
    }

    fn push_var(&mut self, def: VarDef) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(def);
        id
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            relation,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.vars[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            variables: self.vars.len(),
            binaries: self
                .vars
                .iter()
                .filter(|v| v.kind == VarKind::Binary)
                .count(),
            constraints: self.constraints.len(),
        }
    }

    /// Names of constraints and variable bounds violated by `values`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        let mut out = Vec::new();
        for (i, var) in self.vars.iter().enumerate() {
            let Some(value) = values.get(i).copied() else {
                out.push(format!("{}: missing value", var.name));
                continue;
            };
            if value < var.lower - tolerance || value > var.upper + tolerance {
                out.push(format!("{}: {value} outside bounds", var.name));
            }
            if var.kind == VarKind::Binary && (value - value.round()).abs() > tolerance {
                out.push(format!("{}: {value} not integral", var.name));
            }
        }
        for c in &self.constraints {
            if !c.is_satisfied(values, tolerance) {
                out.push(c.name.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_expr_merges_duplicate_terms() {
        let mut m = Model::new();
        let a = m.add_binary("a");
        let b = m.add_binary("b");

        let mut expr = LinearExpr::new().with(a, 2.0).with(b, 1.0);
        expr.add(a, 3.0);
        assert_eq!(expr.terms(), &[(a, 5.0), (b, 1.0)]);

        expr.add(b, -1.0);
        assert_eq!(expr.terms(), &[(a, 5.0)]);
        assert_eq!(expr.coeff(b), 0.0);
    }

    #[test]
    fn cancelled_terms_keep_lookups_consistent() {
        let mut m = Model::new();
        let vars: Vec<VarId> = (0..4).map(|i| m.add_binary(format!("v{i}"))).collect();

        let mut expr: LinearExpr = vars.iter().map(|&v| (v, 1.0)).collect();
        expr.add(vars[1], -1.0);
        assert_eq!(expr.terms().len(), 3);
        assert_eq!(expr.coeff(vars[1]), 0.0);
        assert_eq!(expr.coeff(vars[3]), 1.0);

        expr.add(vars[3], 2.0);
        expr.add(vars[1], 4.0);
        assert_eq!(expr.coeff(vars[3]), 3.0);
        assert_eq!(expr.coeff(vars[1]), 4.0);
        assert_eq!(expr.evaluate(&[1.0, 1.0, 1.0, 1.0]), 9.0);
    }

    #[test]
    fn wide_rows_merge_repeats() {
        let mut m = Model::new();
        let vars: Vec<VarId> = (0..1000).map(|i| m.add_binary(format!("x{i}"))).collect();

        let mut expr: LinearExpr = vars.iter().map(|&v| (v, 1.0)).collect();
        expr.extend(vars.iter().map(|&v| (v, 1.0)));
        assert_eq!(expr.terms().len(), 1000);
        assert!(expr.terms().iter().all(|(_, c)| *c == 2.0));
    }

    #[test]
    fn zero_coefficients_are_dropped() {
        let mut m = Model::new();
        let a = m.add_binary("a");
        let expr: LinearExpr = [(a, 0.0)].into_iter().collect();
        assert!(expr.is_empty());
    }

    #[test]
    fn evaluate_and_check_constraints() {
        let mut m = Model::new();
        let a = m.add_binary("a");
        let u = m.add_continuous("u", 0.0, f64::INFINITY);
        m.add_constraint("sum", LinearExpr::new().with(a, 1.0).with(u, 2.0), Relation::Le, 3.0);

        assert!(m.violations(&[1.0, 1.0], 1e-9).is_empty());
        assert_eq!(m.violations(&[1.0, 1.5], 1e-9), vec!["sum".to_string()]);
        assert_eq!(m.violations(&[0.5, 0.0], 1e-9), vec!["a: 0.5 not integral".to_string()]);
    }

    #[test]
    fn stats_count_binaries() {
        let mut m = Model::new();
        m.add_binary("a");
        m.add_binary("b");
        m.add_continuous("c", 0.0, 1.0);
        m.add_constraint("k", LinearExpr::new(), Relation::Eq, 0.0);
        assert_eq!(
            m.stats(),
            ModelStats {
                variables: 3,
                binaries: 2,
                constraints: 1
            }
        );
    }

    #[test]
    fn relation_tolerance() {
        assert!(Relation::Eq.holds(1.0 + 1e-10, 1.0, 1e-9));
        assert!(!Relation::Le.holds(1.1, 1.0, 1e-9));
        assert!(Relation::Ge.holds(1.0, 1.0, 0.0));
    }
}
