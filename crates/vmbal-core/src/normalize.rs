//! Input normalization — loose [`RawSpec`] to canonical [`RebalanceProblem`].
//!
//! Every reference is resolved here. Once a problem exists, downstream
//! code never has to handle an unknown id or a missing field.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{EntityKind, ValidationError, ValidationResult};
use crate::input::{RawCluster, RawHost, RawSpec, RawVm, RawWeights};
use crate::types::{Cluster, Host, RebalanceProblem, Vm, Weights};

const DEFAULT_OVERCOMMIT: f64 = 1.0;

/// Converts raw inputs into validated problems.
#[derive(Debug, Clone, Default)]
pub struct SpecNormalizer {
    default_weights: Weights,
}

impl SpecNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `weights` for any weight the input leaves out.
    pub fn with_default_weights(mut self, weights: Weights) -> Self {
        self.default_weights = weights;
        self
    }

    /// Parse and normalize a JSON document.
    pub fn normalize_json(&self, input: &str) -> ValidationResult<RebalanceProblem> {
        let raw = RawSpec::from_json_str(input)?;
        self.normalize(&raw)
    }

    /// Normalize an already-deserialized input.
    pub fn normalize(&self, raw: &RawSpec) -> ValidationResult<RebalanceProblem> {
        let hosts = raw
            .hosts
            .iter()
            .enumerate()
            .map(|(i, h)| normalize_host(i, h))
            .collect::<ValidationResult<Vec<_>>>()?;
        let host_index = index_ids(EntityKind::Host, hosts.iter().map(|h| h.id.as_str()))?;

        let clusters = raw
            .clusters
            .iter()
            .enumerate()
            .map(|(i, c)| normalize_cluster(i, c))
            .collect::<ValidationResult<Vec<_>>>()?;
        let cluster_index =
            index_ids(EntityKind::Cluster, clusters.iter().map(|c| c.id.as_str()))?;

        let vms = raw
            .vms
            .iter()
            .enumerate()
            .map(|(i, v)| normalize_vm(i, v))
            .collect::<ValidationResult<Vec<_>>>()?;
        let vm_index = index_ids(EntityKind::Vm, vms.iter().map(|v| v.id.as_str()))?;

        let mut members = vec![Vec::new(); clusters.len()];
        for (vi, vm) in vms.iter().enumerate() {
            let Some(cid) = &vm.cluster else { continue };
            let ci = cluster_index
                .get(cid.as_str())
                .ok_or_else(|| ValidationError::UnknownCluster {
                    vm: vm.id.clone(),
                    cluster: cid.clone(),
                })?;
            members[*ci].push(vi);
        }

        let mut orig_host: Vec<Option<usize>> = vec![None; vms.len()];
        for (host_id, vm_ids) in &raw.initial_placement {
            let hi = *host_index
                .get(host_id.as_str())
                .ok_or_else(|| ValidationError::UnknownHost(host_id.clone()))?;
            for vm_id in vm_ids {
                let vi = *vm_index
                    .get(vm_id.as_str())
                    .ok_or_else(|| ValidationError::UnknownVm {
                        host: host_id.clone(),
                        vm: vm_id.clone(),
                    })?;
                if let Some(prev) = orig_host[vi] {
                    return Err(ValidationError::DuplicatePlacement {
                        vm: vm_id.clone(),
                        first: hosts[prev].id.clone(),
                        second: host_id.clone(),
                    });
                }
                orig_host[vi] = Some(hi);
            }
        }

        let weights = self.resolve_weights(raw.weights.as_ref())?;

        debug!(
            hosts = hosts.len(),
            vms = vms.len(),
            clusters = clusters.len(),
            placed = orig_host.iter().filter(|h| h.is_some()).count(),
            "normalized rebalance input"
        );

        Ok(RebalanceProblem::new(
            hosts, vms, clusters, weights, orig_host, members,
        ))
    }

    fn resolve_weights(&self, raw: Option<&RawWeights>) -> ValidationResult<Weights> {
        let d = self.default_weights;
        let (alpha, beta, gamma) = match raw {
            Some(w) => (
                w.alpha.unwrap_or(d.alpha),
                w.beta.unwrap_or(d.beta),
                w.gamma.unwrap_or(d.gamma),
            ),
            None => (d.alpha, d.beta, d.gamma),
        };
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !is_non_negative(value) {
                return Err(ValidationError::InvalidWeight { name, value });
            }
        }
        Ok(Weights { alpha, beta, gamma })
    }
}

fn normalize_host(index: usize, raw: &RawHost) -> ValidationResult<Host> {
    let id = require_id(EntityKind::Host, index, raw.id.as_deref())?;
    let field = |name: &'static str, value: Option<f64>| {
        let value = value.ok_or_else(|| ValidationError::MissingField {
            kind: EntityKind::Host,
            id: id.clone(),
            field: name,
        })?;
        check_number(EntityKind::Host, &id, name, value)
    };
    let cpu_capacity = field("cpu_capacity", raw.cpu_capacity)?;
    let mem_capacity = field("mem_capacity", raw.mem_capacity)?;
    let oc_cpu = field("oc_cpu", Some(raw.oc_cpu.unwrap_or(DEFAULT_OVERCOMMIT)))?;
    let oc_mem = field("oc_mem", Some(raw.oc_mem.unwrap_or(DEFAULT_OVERCOMMIT)))?;

    Ok(Host {
        id,
        cpu_capacity,
        mem_capacity,
        oc_cpu,
        oc_mem,
    })
}

fn normalize_vm(index: usize, raw: &RawVm) -> ValidationResult<Vm> {
    let id = require_id(EntityKind::Vm, index, raw.id.as_deref())?;
    let field = |name: &'static str, value: Option<f64>| {
        let value = value.ok_or_else(|| ValidationError::MissingField {
            kind: EntityKind::Vm,
            id: id.clone(),
            field: name,
        })?;
        check_number(EntityKind::Vm, &id, name, value)
    };
    let cpu = field("cpu", raw.cpu)?;
    let mem = field("mem", raw.mem)?;

    Ok(Vm {
        id,
        cpu,
        mem,
        cluster: raw.cluster.clone(),
    })
}

fn normalize_cluster(index: usize, raw: &RawCluster) -> ValidationResult<Cluster> {
    let id = require_id(EntityKind::Cluster, index, raw.id.as_deref())?;
    let value = raw.size.ok_or_else(|| ValidationError::MissingField {
        kind: EntityKind::Cluster,
        id: id.clone(),
        field: "size",
    })?;
    if !is_non_negative(value) || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(ValidationError::InvalidSize { cluster: id, value });
    }
    let size = value as u32;

    Ok(Cluster {
        id,
        size,
        hard_excl: raw.hard_excl,
    })
}

fn require_id(kind: EntityKind, index: usize, id: Option<&str>) -> ValidationResult<String> {
    let id = id.ok_or(ValidationError::MissingId { kind, index })?;
    if id.trim().is_empty() || id.trim() != id {
        return Err(ValidationError::MalformedId {
            kind,
            id: id.to_string(),
        });
    }
    Ok(id.to_string())
}

fn check_number(kind: EntityKind, id: &str, field: &'static str, value: f64) -> ValidationResult<f64> {
    if is_non_negative(value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidNumber {
            kind,
            id: id.to_string(),
            field,
            value,
        })
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Map ids to their position, rejecting duplicates.
fn index_ids<'a>(
    kind: EntityKind,
    ids: impl Iterator<Item = &'a str>,
) -> ValidationResult<HashMap<&'a str, usize>> {
    let mut index = HashMap::new();
    for (i, id) in ids.enumerate() {
        if index.insert(id, i).is_some() {
            return Err(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(json: &str) -> ValidationResult<RebalanceProblem> {
        SpecNormalizer::new().normalize_json(json)
    }

    const BASIC: &str = r#"{
        "hosts": [
            {"id": "H1", "cpu_cap": 32, "mem_cap": 128},
            {"id": "H2", "cpu_capacity": 16, "mem_capacity": 64, "oc_cpu": 2.0}
        ],
        "vms": [
            {"id": "V1", "cpu": 8, "mem": 16, "cluster": "C1"},
            {"id": "V2", "cpu": 4, "mem": 8},
            {"id": "V3", "cpu": 2, "mem": 4, "cluster": "C1"}
        ],
        "initial_placement": {"H2": ["V2"], "H1": ["V1"]},
        "clusters": [{"id": "C1", "size": 2, "hard_excl": true}, {"id": "C2", "size": 1}],
        "weights": {"alpha_balance": 2.0, "gamma": 0.5}
    }"#;

    #[test]
    fn normalizes_aliases_and_defaults() {
        let p = normalize(BASIC).unwrap();

        assert_eq!(p.hosts().len(), 2);
        assert_eq!(p.hosts()[0].cpu_capacity, 32.0);
        assert_eq!(p.hosts()[0].oc_cpu, 1.0);
        assert_eq!(p.hosts()[1].effective_cpu(), 32.0);
        assert_eq!(p.hosts()[1].oc_mem, 1.0);

        let w = p.weights();
        assert_eq!((w.alpha, w.beta, w.gamma), (2.0, 1.0, 0.5));
    }

    #[test]
    fn derives_origin_hosts() {
        let p = normalize(BASIC).unwrap();
        assert_eq!(p.orig_host(0), Some(0));
        assert_eq!(p.orig_host(1), Some(1));
        assert_eq!(p.orig_host(2), None);
        assert_eq!(p.placed_vm_count(), 2);
    }

    #[test]
    fn groups_cluster_members_in_vm_order() {
        let p = normalize(BASIC).unwrap();
        assert_eq!(p.members(0), &[0, 2]);
        assert!(p.members(1).is_empty());
        assert!(p.clusters()[0].hard_excl);
        assert!(!p.clusters()[1].hard_excl);
    }

    #[test]
    fn config_weights_fill_gaps() {
        let normalizer = SpecNormalizer::new().with_default_weights(Weights {
            alpha: 3.0,
            beta: 4.0,
            gamma: 5.0,
        });
        let p = normalizer
            .normalize_json(r#"{"weights": {"beta": 0.25}}"#)
            .unwrap();
        let w = p.weights();
        assert_eq!((w.alpha, w.beta, w.gamma), (3.0, 0.25, 5.0));
    }

    #[test]
    fn missing_capacity_is_rejected() {
        let err = normalize(r#"{"hosts": [{"id": "H1", "cpu_cap": 4}]}"#).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                kind: EntityKind::Host,
                id: "H1".to_string(),
                field: "mem_capacity",
            }
        );
    }

    #[test]
    fn missing_demand_is_rejected() {
        let err = normalize(r#"{"vms": [{"id": "V1", "mem": 4}]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "cpu", .. }));
    }

    #[test]
    fn missing_and_blank_ids_are_rejected() {
        let err = normalize(r#"{"vms": [{"cpu": 1, "mem": 1}]}"#).unwrap_err();
        assert_eq!(err, ValidationError::MissingId { kind: EntityKind::Vm, index: 0 });

        let err = normalize(r#"{"hosts": [{"id": "  ", "cpu_cap": 1, "mem_cap": 1}]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedId { kind: EntityKind::Host, .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = normalize(
            r#"{"hosts": [{"id": "H1", "cpu_cap": 1, "mem_cap": 1}, {"id": "H1", "cpu_cap": 2, "mem_cap": 2}]}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateId { kind: EntityKind::Host, id: "H1".to_string() }
        );
    }

    #[test]
    fn negative_numbers_are_rejected() {
        let err = normalize(r#"{"vms": [{"id": "V1", "cpu": -1, "mem": 1}]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidNumber { field: "cpu", .. }));

        let err = normalize(r#"{"weights": {"beta": -0.5}}"#).unwrap_err();
        assert_eq!(err, ValidationError::InvalidWeight { name: "beta", value: -0.5 });
    }

    #[test]
    fn zero_capacity_host_is_accepted() {
        let p = normalize(r#"{"hosts": [{"id": "H0", "cpu_cap": 0, "mem_cap": 0}]}"#).unwrap();
        assert_eq!(p.hosts()[0].effective_cpu(), 0.0);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let err = normalize(r#"{"initial_placement": {"H9": []}}"#).unwrap_err();
        assert_eq!(err, ValidationError::UnknownHost("H9".to_string()));

        let err = normalize(
            r#"{"hosts": [{"id": "H1", "cpu_cap": 1, "mem_cap": 1}], "initial_placement": {"H1": ["V9"]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownVm { .. }));

        let err = normalize(r#"{"vms": [{"id": "V1", "cpu": 1, "mem": 1, "cluster": "C9"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownCluster { .. }));
    }

    #[test]
    fn vm_placed_twice_is_rejected() {
        let err = normalize(
            r#"{
                "hosts": [{"id": "H1", "cpu_cap": 1, "mem_cap": 1}, {"id": "H2", "cpu_cap": 1, "mem_cap": 1}],
                "vms": [{"id": "V1", "cpu": 1, "mem": 1}],
                "initial_placement": {"H1": ["V1"], "H2": ["V1"]}
            }"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicatePlacement {
                vm: "V1".to_string(),
                first: "H1".to_string(),
                second: "H2".to_string(),
            }
        );
    }

    #[test]
    fn integral_float_cluster_size_is_accepted() {
        let p = normalize(r#"{"clusters": [{"id": "C1", "size": 2.0}, {"id": "C2", "size": 3}]}"#)
            .unwrap();
        assert_eq!(p.clusters()[0].size, 2);
        assert_eq!(p.clusters()[1].size, 3);
    }

    #[test]
    fn fractional_or_negative_cluster_size_is_rejected() {
        for size in ["2.5", "-1"] {
            let err = normalize(&format!(r#"{{"clusters": [{{"id": "C1", "size": {size}}}]}}"#))
                .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidSize { ref cluster, .. } if cluster == "C1"));
        }
    }

    #[test]
    fn cluster_without_size_is_rejected() {
        let err = normalize(r#"{"clusters": [{"id": "C1"}]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "size", .. }));
    }
}
