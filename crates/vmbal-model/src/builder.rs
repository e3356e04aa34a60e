//! Constraint model builder — declares decision variables and emits the
//! hard and soft constraints of a rebalancing problem.
//!
//! Variables (all created fresh for each build):
//! - `x[v,h]` binary: VM `v` runs on host `h`
//! - `y[h]` binary: host `h` is active
//! - `u[c,h]` binary: cluster `c` has a member on `h` (clusters with members only)
//! - `s[c]` continuous: dispersion shortfall of cluster `c`
//! - `m[v]` binary: VM `v` moved away from its origin host
//! - `U[h]`, `U_max`, `U_min` continuous: CPU utilization ratio and its bounds

use tracing::debug;

use vmbal_core::RebalanceProblem;

use crate::model::{LinearExpr, Model, Relation, VarId};

/// Handles to every decision variable, indexed by domain position.
#[derive(Debug, Clone)]
pub struct DecisionVars {
    /// `[vm][host]`.
    pub x: Vec<Vec<VarId>>,
    pub y: Vec<VarId>,
    /// `[cluster][host]`; `None` for clusters without members.
    pub u: Vec<Option<Vec<VarId>>>,
    pub s: Vec<VarId>,
    pub m: Vec<VarId>,
    pub util: Vec<VarId>,
    pub u_max: VarId,
    pub u_min: VarId,
}

/// A model together with the map back to the domain.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub model: Model,
    pub vars: DecisionVars,
}

pub struct ConstraintModelBuilder<'a> {
    problem: &'a RebalanceProblem,
}

impl<'a> ConstraintModelBuilder<'a> {
    pub fn new(problem: &'a RebalanceProblem) -> Self {
        Self { problem }
    }

    /// Declare variables and emit all constraints. The objective is left
    /// empty for the composer to fill in.
    pub fn build(&self) -> BuiltModel {
        let mut model = Model::new();
        let vars = self.declare(&mut model);

        self.assignment(&mut model, &vars);
        self.activation_and_capacity(&mut model, &vars);
        self.clusters(&mut model, &vars);
        self.migration(&mut model, &vars);
        self.utilization(&mut model, &vars);

        let stats = model.stats();
        debug!(
            variables = stats.variables,
            binaries = stats.binaries,
            constraints = stats.constraints,
            "built rebalance model"
        );

        BuiltModel { model, vars }
    }

    fn declare(&self, model: &mut Model) -> DecisionVars {
        let p = self.problem;
        let hosts = p.hosts();

        let x: Vec<Vec<VarId>> = p
            .vms()
            .iter()
            .map(|vm| {
                hosts
                    .iter()
                    .map(|h| model.add_binary(format!("x_{}_{}", vm.id, h.id)))
                    .collect()
            })
            .collect();
        let y: Vec<VarId> = hosts
            .iter()
            .map(|h| model.add_binary(format!("y_{}", h.id)))
            .collect();

        let u: Vec<Option<Vec<VarId>>> = p
            .clusters()
            .iter()
            .enumerate()
            .map(|(ci, c)| {
                if p.members(ci).is_empty() {
                    return None;
                }
                Some(
                    hosts
                        .iter()
                        .map(|h| model.add_binary(format!("u_{}_{}", c.id, h.id)))
                        .collect(),
                )
            })
            .collect();
        let s: Vec<VarId> = p
            .clusters()
            .iter()
            .map(|c| model.add_continuous(format!("s_{}", c.id), 0.0, f64::INFINITY))
            .collect();

        let m: Vec<VarId> = p
            .vms()
            .iter()
            .map(|vm| model.add_binary(format!("m_{}", vm.id)))
            .collect();

        let util: Vec<VarId> = hosts
            .iter()
            .map(|h| model.add_continuous(format!("U_{}", h.id), 0.0, f64::INFINITY))
            .collect();
        let u_max = model.add_continuous("U_max", 0.0, f64::INFINITY);
        let u_min = model.add_continuous("U_min", 0.0, f64::INFINITY);

        DecisionVars {
            x,
            y,
            u,
            s,
            m,
            util,
            u_max,
            u_min,
        }
    }

    /// Each VM on exactly one host.
    fn assignment(&self, model: &mut Model, vars: &DecisionVars) {
        for (vi, vm) in self.problem.vms().iter().enumerate() {
            let expr = vars.x[vi].iter().map(|&x| (x, 1.0)).collect();
            model.add_constraint(format!("assign_{}", vm.id), expr, Relation::Eq, 1.0);
        }
    }

    /// Host activation (big-M on VM count) and CPU / memory capacity.
    fn activation_and_capacity(&self, model: &mut Model, vars: &DecisionVars) {
        let p = self.problem;
        let big_m = p.vms().len() as f64;

        for (hi, host) in p.hosts().iter().enumerate() {
            let mut active: LinearExpr = column(vars, hi).map(|(_, x)| (x, 1.0)).collect();
            active.add(vars.y[hi], -big_m);
            model.add_constraint(format!("host_active_{}", host.id), active, Relation::Le, 0.0);

            let mut cpu: LinearExpr = column(vars, hi)
                .map(|(vi, x)| (x, p.vms()[vi].cpu))
                .collect();
            cpu.add(vars.y[hi], -host.effective_cpu());
            model.add_constraint(format!("cpu_cap_{}", host.id), cpu, Relation::Le, 0.0);

            let mut mem: LinearExpr = column(vars, hi)
                .map(|(vi, x)| (x, p.vms()[vi].mem))
                .collect();
            mem.add(vars.y[hi], -host.effective_mem());
            model.add_constraint(format!("mem_cap_{}", host.id), mem, Relation::Le, 0.0);
        }
    }

    /// Host indicators, hard exclusivity and dispersion accounting.
    fn clusters(&self, model: &mut Model, vars: &DecisionVars) {
        let p = self.problem;

        for (ci, cluster) in p.clusters().iter().enumerate() {
            let members = p.members(ci);
            let Some(u) = &vars.u[ci] else {
                model.add_constraint(
                    format!("empty_cluster_{}", cluster.id),
                    LinearExpr::new().with(vars.s[ci], 1.0),
                    Relation::Eq,
                    0.0,
                );
                continue;
            };

            for (hi, host) in p.hosts().iter().enumerate() {
                let on_host: LinearExpr = members.iter().map(|&vi| (vars.x[vi][hi], 1.0)).collect();

                let mut lb = on_host.clone();
                lb.add(u[hi], -1.0);
                model.add_constraint(format!("u_lb_{}_{}", cluster.id, host.id), lb, Relation::Ge, 0.0);

                let mut ub = on_host.clone();
                ub.add(u[hi], -(members.len() as f64));
                model.add_constraint(format!("u_ub_{}_{}", cluster.id, host.id), ub, Relation::Le, 0.0);

                if cluster.hard_excl {
                    model.add_constraint(
                        format!("hard_excl_{}_{}", cluster.id, host.id),
                        on_host,
                        Relation::Le,
                        1.0,
                    );
                }
            }

            let mut dispersion: LinearExpr = u.iter().map(|&u| (u, 1.0)).collect();
            dispersion.add(vars.s[ci], 1.0);
            model.add_constraint(
                format!("cluster_size_{}", cluster.id),
                dispersion,
                Relation::Eq,
                f64::from(cluster.size),
            );
        }
    }

    /// Migration flags relative to each VM's origin host.
    fn migration(&self, model: &mut Model, vars: &DecisionVars) {
        for (vi, vm) in self.problem.vms().iter().enumerate() {
            match self.problem.orig_host(vi) {
                Some(orig) => model.add_constraint(
                    format!("migration_lb_{}", vm.id),
                    LinearExpr::new().with(vars.m[vi], 1.0).with(vars.x[vi][orig], 1.0),
                    Relation::Ge,
                    1.0,
                ),
                None => model.add_constraint(
                    format!("migration_none_{}", vm.id),
                    LinearExpr::new().with(vars.m[vi], 1.0),
                    Relation::Eq,
                    0.0,
                ),
            }
        }
    }

    /// Utilization ratio per host and the global spread bounds.
    ///
    /// Inactive hosts are bounded too, so one empty host pins `U_min` to 0.
    fn utilization(&self, model: &mut Model, vars: &DecisionVars) {
        let p = self.problem;

        for (hi, host) in p.hosts().iter().enumerate() {
            let denom = host.effective_cpu();
            if denom > 0.0 {
                let mut def: LinearExpr = column(vars, hi)
                    .map(|(vi, x)| (x, p.vms()[vi].cpu))
                    .collect();
                def.add(vars.util[hi], -denom);
                model.add_constraint(format!("util_def_{}", host.id), def, Relation::Eq, 0.0);
            } else {
                model.add_constraint(
                    format!("U_zero_{}", host.id),
                    LinearExpr::new().with(vars.util[hi], 1.0),
                    Relation::Eq,
                    0.0,
                );
            }

            model.add_constraint(
                format!("U_max_{}", host.id),
                LinearExpr::new().with(vars.util[hi], 1.0).with(vars.u_max, -1.0),
                Relation::Le,
                0.0,
            );
            model.add_constraint(
                format!("U_min_{}", host.id),
                LinearExpr::new().with(vars.util[hi], 1.0).with(vars.u_min, -1.0),
                Relation::Ge,
                0.0,
            );
        }
    }
}

/// `(vm index, x[vm][host])` for one host.
fn column(vars: &DecisionVars, host: usize) -> impl Iterator<Item = (usize, VarId)> + '_ {
    vars.x.iter().enumerate().map(move |(vi, row)| (vi, row[host]))
}

impl DecisionVars {
    /// Variable values implied by a concrete placement (`host_of[vm]` is a host index).
    ///
    /// Cluster slack takes whatever value dispersion accounting requires, so an
    /// over-dispersed cluster shows up as a negative `s` and fails the model's
    /// bound check.
    pub fn values_for_assignment(
        &self,
        problem: &RebalanceProblem,
        model: &Model,
        host_of: &[usize],
    ) -> Vec<f64> {
        let mut values = vec![0.0; model.vars().len()];
        let hosts = problem.hosts();

        for (vi, &hi) in host_of.iter().enumerate() {
            values[self.x[vi][hi].index()] = 1.0;
            values[self.y[hi].index()] = 1.0;
            if problem.orig_host(vi).is_some_and(|orig| orig != hi) {
                values[self.m[vi].index()] = 1.0;
            }
        }

        for (ci, cluster) in problem.clusters().iter().enumerate() {
            let mut occupied = 0u32;
            if let Some(u) = &self.u[ci] {
                for (hi, var) in u.iter().enumerate() {
                    if problem.members(ci).iter().any(|&vi| host_of.get(vi) == Some(&hi)) {
                        values[var.index()] = 1.0;
                        occupied += 1;
                    }
                }
                values[self.s[ci].index()] = f64::from(cluster.size) - f64::from(occupied);
            }
        }

        let mut lo = f64::INFINITY;
        let mut hi_util: f64 = 0.0;
        for (hi, host) in hosts.iter().enumerate() {
            let denom = host.effective_cpu();
            let util = if denom > 0.0 {
                host_of
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| **h == hi)
                    .map(|(vi, _)| problem.vms()[vi].cpu)
                    .sum::<f64>()
                    / denom
            } else {
                0.0
            };
            values[self.util[hi].index()] = util;
            lo = lo.min(util);
            hi_util = hi_util.max(util);
        }
        values[self.u_max.index()] = hi_util;
        values[self.u_min.index()] = if lo.is_finite() { lo } else { 0.0 };

        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmbal_core::SpecNormalizer;

    fn problem(json: &str) -> RebalanceProblem {
        SpecNormalizer::new().normalize_json(json).unwrap()
    }

    const MIXED: &str = r#"{
        "hosts": [
            {"id": "H1", "cpu_cap": 16, "mem_cap": 64},
            {"id": "H2", "cpu_cap": 16, "mem_cap": 64, "oc_cpu": 2.0},
            {"id": "H0", "cpu_cap": 0, "mem_cap": 0}
        ],
        "vms": [
            {"id": "A", "cpu": 4, "mem": 8, "cluster": "C"},
            {"id": "B", "cpu": 4, "mem": 8, "cluster": "C"},
            {"id": "N", "cpu": 2, "mem": 2}
        ],
        "initial_placement": {"H1": ["A", "B"]},
        "clusters": [{"id": "C", "size": 2, "hard_excl": true}, {"id": "E", "size": 3}]
    }"#;

    #[test]
    fn declares_expected_variables() {
        let p = problem(MIXED);
        let built = ConstraintModelBuilder::new(&p).build();
        let stats = built.model.stats();

        // x: 3*3, y: 3, u: 3 (only C), m: 3 binaries; s: 2, U: 3, bounds: 2 continuous.
        assert_eq!(stats.binaries, 9 + 3 + 3 + 3);
        assert_eq!(stats.variables, 18 + 2 + 3 + 2);
        assert!(built.vars.u[1].is_none());
        assert_eq!(built.model.var(built.vars.x[2][1]).name, "x_N_H2");
    }

    #[test]
    fn emits_expected_constraints() {
        let p = problem(MIXED);
        let model = ConstraintModelBuilder::new(&p).build().model;

        // assign 3, activation+capacity 9, cluster C: 3 hosts * 3 + size 1,
        // empty E 1, migration 3, utilization 3 * 3.
        assert_eq!(model.constraints().len(), 3 + 9 + 10 + 1 + 3 + 9);

        for name in [
            "assign_A",
            "host_active_H1",
            "cpu_cap_H2",
            "mem_cap_H0",
            "u_lb_C_H1",
            "u_ub_C_H2",
            "hard_excl_C_H0",
            "cluster_size_C",
            "empty_cluster_E",
            "migration_lb_A",
            "migration_none_N",
            "util_def_H1",
            "U_zero_H0",
            "U_max_H2",
            "U_min_H0",
        ] {
            assert!(model.constraint(name).is_some(), "missing constraint {name}");
        }
        assert!(model.constraint("util_def_H0").is_none());
        assert!(model.constraint("u_lb_E_H1").is_none());
    }

    #[test]
    fn capacity_uses_overcommitted_capacity() {
        let p = problem(MIXED);
        let built = ConstraintModelBuilder::new(&p).build();
        let cpu = built.model.constraint("cpu_cap_H2").unwrap();

        assert_eq!(cpu.relation, Relation::Le);
        assert_eq!(cpu.expr.coeff(built.vars.y[1]), -32.0);
        assert_eq!(cpu.expr.coeff(built.vars.x[0][1]), 4.0);

        let util = built.model.constraint("util_def_H2").unwrap();
        assert_eq!(util.expr.coeff(built.vars.util[1]), -32.0);
    }

    #[test]
    fn migration_links_to_origin_host() {
        let p = problem(MIXED);
        let built = ConstraintModelBuilder::new(&p).build();
        let c = built.model.constraint("migration_lb_B").unwrap();

        assert_eq!(c.relation, Relation::Ge);
        assert_eq!(c.rhs, 1.0);
        assert_eq!(c.expr.coeff(built.vars.m[1]), 1.0);
        assert_eq!(c.expr.coeff(built.vars.x[1][0]), 1.0);
        assert_eq!(c.expr.coeff(built.vars.x[1][1]), 0.0);
    }

    #[test]
    fn feasible_placement_satisfies_model() {
        let p = problem(MIXED);
        let built = ConstraintModelBuilder::new(&p).build();

        // A stays, B moves to H2, N lands on H2.
        let values = built.vars.values_for_assignment(&p, &built.model, &[0, 1, 1]);
        assert!(built.model.violations(&values, 1e-9).is_empty());
        assert_eq!(values[built.vars.m[1].index()], 1.0);
        assert_eq!(values[built.vars.util[1].index()], 6.0 / 32.0);
        assert_eq!(values[built.vars.u_min.index()], 0.0);
    }

    #[test]
    fn co_located_exclusive_members_violate_model() {
        let p = problem(MIXED);
        let built = ConstraintModelBuilder::new(&p).build();

        let values = built.vars.values_for_assignment(&p, &built.model, &[0, 0, 1]);
        let violations = built.model.violations(&values, 1e-9);
        assert!(violations.contains(&"hard_excl_C_H1".to_string()));
    }

    #[test]
    fn zero_capacity_host_rejects_demand() {
        let p = problem(MIXED);
        let built = ConstraintModelBuilder::new(&p).build();

        let values = built.vars.values_for_assignment(&p, &built.model, &[0, 1, 2]);
        let violations = built.model.violations(&values, 1e-9);
        assert!(violations.contains(&"cpu_cap_H0".to_string()));
        assert_eq!(values[built.vars.util[2].index()], 0.0);
    }

    #[test]
    fn empty_problem_builds_bounds_only() {
        let p = problem("{}");
        let built = ConstraintModelBuilder::new(&p).build();
        assert_eq!(built.model.stats().variables, 2);
        assert!(built.model.constraints().is_empty());
    }
}
