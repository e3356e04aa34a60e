//! Independent re-check of a plan against the problem it claims to solve.
//!
//! The checks mirror the hard constraints of the model but read only the
//! domain-level plan, so a bad projection or a misbehaving engine shows up
//! here rather than downstream.

use std::collections::HashMap;

use crate::plan::RebalancePlan;
use crate::types::RebalanceProblem;

/// Absolute slack allowed on capacity sums.
pub const CAPACITY_TOLERANCE: f64 = 1e-6;

/// A single inconsistency found in a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditFinding {
    UnassignedVm { vm: String },
    DuplicateAssignment { vm: String },
    UnknownVm { vm: String },
    UnknownHost { vm: String, host: String },
    CpuOvercommitted { host: String, demand: f64, capacity: f64 },
    MemOvercommitted { host: String, demand: f64, capacity: f64 },
    ExclusivityViolated { cluster: String, host: String, members: usize },
    MigrationMismatch { vm: String, reported: Option<u8>, expected: u8 },
}

impl std::fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditFinding::UnassignedVm { vm } => write!(f, "vm {vm} has no host"),
            AuditFinding::DuplicateAssignment { vm } => write!(f, "vm {vm} is assigned more than once"),
            AuditFinding::UnknownVm { vm } => write!(f, "plan assigns unknown vm {vm}"),
            AuditFinding::UnknownHost { vm, host } => write!(f, "vm {vm} is assigned to unknown host {host}"),
            AuditFinding::CpuOvercommitted { host, demand, capacity } => {
                write!(f, "host {host} cpu demand {demand} exceeds capacity {capacity}")
            }
            AuditFinding::MemOvercommitted { host, demand, capacity } => {
                write!(f, "host {host} mem demand {demand} exceeds capacity {capacity}")
            }
            AuditFinding::ExclusivityViolated { cluster, host, members } => {
                write!(f, "host {host} holds {members} members of exclusive cluster {cluster}")
            }
            AuditFinding::MigrationMismatch { vm, reported, expected } => match reported {
                Some(r) => write!(f, "vm {vm} migration flag is {r}, expected {expected}"),
                None => write!(f, "vm {vm} has no migration flag, expected {expected}"),
            },
        }
    }
}

/// Check `plan` against `problem`. An unsolved plan has nothing to check.
pub fn audit(problem: &RebalanceProblem, plan: &RebalancePlan) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    if !plan.is_solved() {
        return findings;
    }

    let hosts = problem.hosts();
    let vms = problem.vms();

    // VM index → host index.
    let mut host_of: Vec<Option<usize>> = vec![None; vms.len()];
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for p in &plan.assignment {
        let Some(vi) = problem.vm_index(&p.vm) else {
            findings.push(AuditFinding::UnknownVm { vm: p.vm.clone() });
            continue;
        };
        *seen.entry(p.vm.as_str()).or_insert(0) += 1;
        match problem.host_index(&p.host) {
            Some(hi) => host_of[vi] = Some(hi),
            None => findings.push(AuditFinding::UnknownHost {
                vm: p.vm.clone(),
                host: p.host.clone(),
            }),
        }
    }

    for vm in vms {
        match seen.get(vm.id.as_str()) {
            None => findings.push(AuditFinding::UnassignedVm { vm: vm.id.clone() }),
            Some(n) if *n > 1 => findings.push(AuditFinding::DuplicateAssignment { vm: vm.id.clone() }),
            Some(_) => {}
        }
    }

    let mut cpu = vec![0.0; hosts.len()];
    let mut mem = vec![0.0; hosts.len()];
    for (vi, hi) in host_of.iter().enumerate() {
        if let Some(hi) = hi {
            cpu[*hi] += vms[vi].cpu;
            mem[*hi] += vms[vi].mem;
        }
    }
    for (hi, host) in hosts.iter().enumerate() {
        if cpu[hi] > host.effective_cpu() + CAPACITY_TOLERANCE {
            findings.push(AuditFinding::CpuOvercommitted {
                host: host.id.clone(),
                demand: cpu[hi],
                capacity: host.effective_cpu(),
            });
        }
        if mem[hi] > host.effective_mem() + CAPACITY_TOLERANCE {
            findings.push(AuditFinding::MemOvercommitted {
                host: host.id.clone(),
                demand: mem[hi],
                capacity: host.effective_mem(),
            });
        }
    }

    for (ci, cluster) in problem.clusters().iter().enumerate() {
        if !cluster.hard_excl {
            continue;
        }
        let mut per_host = vec![0usize; hosts.len()];
        for &vi in problem.members(ci) {
            if let Some(hi) = host_of[vi] {
                per_host[hi] += 1;
            }
        }
        for (hi, count) in per_host.into_iter().enumerate() {
            if count > 1 {
                findings.push(AuditFinding::ExclusivityViolated {
                    cluster: cluster.id.clone(),
                    host: hosts[hi].id.clone(),
                    members: count,
                });
            }
        }
    }

    for (vi, vm) in vms.iter().enumerate() {
        let expected = match (problem.orig_host(vi), host_of[vi]) {
            (Some(orig), Some(now)) if orig != now => 1,
            _ => 0,
        };
        let reported = plan.migration.get(&vm.id).copied();
        if reported != Some(expected) {
            findings.push(AuditFinding::MigrationMismatch {
                vm: vm.id.clone(),
                reported,
                expected,
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SpecNormalizer;
    use crate::plan::{Placement, SolveStatus};

    fn problem() -> RebalanceProblem {
        SpecNormalizer::new()
            .normalize_json(
                r#"{
                "hosts": [{"id": "H1", "cpu_cap": 10, "mem_cap": 10}, {"id": "H2", "cpu_cap": 10, "mem_cap": 10}],
                "vms": [
                    {"id": "A", "cpu": 6, "mem": 1, "cluster": "C"},
                    {"id": "B", "cpu": 6, "mem": 1, "cluster": "C"},
                    {"id": "N", "cpu": 1, "mem": 1}
                ],
                "initial_placement": {"H1": ["A", "B"]},
                "clusters": [{"id": "C", "size": 2, "hard_excl": true}]
            }"#,
            )
            .unwrap()
    }

    fn plan(assign: &[(&str, &str)], migration: &[(&str, u8)]) -> RebalancePlan {
        let mut plan = RebalancePlan::unsolved(SolveStatus::Optimal);
        plan.assignment = assign
            .iter()
            .map(|(vm, host)| Placement {
                vm: vm.to_string(),
                host: host.to_string(),
            })
            .collect();
        plan.migration = migration.iter().map(|(vm, m)| (vm.to_string(), *m)).collect();
        plan
    }

    #[test]
    fn clean_plan_has_no_findings() {
        let p = plan(
            &[("A", "H1"), ("B", "H2"), ("N", "H2")],
            &[("A", 0), ("B", 1), ("N", 0)],
        );
        assert!(audit(&problem(), &p).is_empty());
    }

    #[test]
    fn detects_overcommit_and_exclusivity() {
        let p = plan(
            &[("A", "H1"), ("B", "H1"), ("N", "H2")],
            &[("A", 0), ("B", 0), ("N", 0)],
        );
        let findings = audit(&problem(), &p);
        assert!(findings.contains(&AuditFinding::CpuOvercommitted {
            host: "H1".to_string(),
            demand: 12.0,
            capacity: 10.0,
        }));
        assert!(findings.contains(&AuditFinding::ExclusivityViolated {
            cluster: "C".to_string(),
            host: "H1".to_string(),
            members: 2,
        }));
    }

    #[test]
    fn detects_missing_and_wrong_migration_flags() {
        let p = plan(&[("A", "H2"), ("B", "H1")], &[("A", 0), ("B", 0)]);
        let findings = audit(&problem(), &p);
        assert!(findings.contains(&AuditFinding::UnassignedVm { vm: "N".to_string() }));
        assert!(findings.contains(&AuditFinding::MigrationMismatch {
            vm: "A".to_string(),
            reported: Some(0),
            expected: 1,
        }));
        assert!(findings.contains(&AuditFinding::MigrationMismatch {
            vm: "N".to_string(),
            reported: None,
            expected: 0,
        }));
    }

    #[test]
    fn unsolved_plans_are_not_audited() {
        let p = RebalancePlan::unsolved(SolveStatus::Infeasible);
        assert!(audit(&problem(), &p).is_empty());
    }
}
