//! Canonical domain types for a rebalancing problem.
//!
//! A [`RebalanceProblem`] is only ever produced by the normalizer, so the
//! cross-references inside it (origin hosts, cluster members) are already
//! resolved to indices and known to be valid.

use serde::{Deserialize, Serialize};

/// Unique identifier for a physical host.
pub type HostId = String;

/// Unique identifier for a virtual machine.
pub type VmId = String;

/// Unique identifier for a VM cluster (affinity group).
pub type ClusterId = String;

// ── Entities ───────────────────────────────────────────────────────

/// A physical machine with fixed capacity and overcommit multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub cpu_capacity: f64,
    pub mem_capacity: f64,
    pub oc_cpu: f64,
    pub oc_mem: f64,
}

impl Host {
    /// CPU capacity after overcommit.
    pub fn effective_cpu(&self) -> f64 {
        self.cpu_capacity * self.oc_cpu
    }

    /// Memory capacity after overcommit.
    pub fn effective_mem(&self) -> f64 {
        self.mem_capacity * self.oc_mem
    }
}

/// A workload with fixed CPU and memory demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vm {
    pub id: VmId,
    pub cpu: f64,
    pub mem: f64,
    pub cluster: Option<ClusterId>,
}

/// A named group of VMs with a target dispersion count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    /// Number of hosts the members are expected to occupy.
    pub size: u32,
    /// At most one member per host when set.
    pub hard_excl: bool,
}

/// Objective weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Balance weight on `U_max - U_min`.
    pub alpha: f64,
    /// Migration weight on the number of moved VMs.
    pub beta: f64,
    /// Soft-violation weight on cluster dispersion shortfall.
    pub gamma: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            gamma: 0.0,
        }
    }
}

// ── Problem ────────────────────────────────────────────────────────

/// A validated, immutable rebalancing problem.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceProblem {
    hosts: Vec<Host>,
    vms: Vec<Vm>,
    clusters: Vec<Cluster>,
    weights: Weights,
    /// VM index → host index it currently runs on.
    orig_host: Vec<Option<usize>>,
    /// Cluster index → member VM indices, in VM input order.
    members: Vec<Vec<usize>>,
}

impl RebalanceProblem {
    pub(crate) fn new(
        hosts: Vec<Host>,
        vms: Vec<Vm>,
        clusters: Vec<Cluster>,
        weights: Weights,
        orig_host: Vec<Option<usize>>,
        members: Vec<Vec<usize>>,
    ) -> Self {
        debug_assert_eq!(orig_host.len(), vms.len());
        debug_assert_eq!(members.len(), clusters.len());
        Self {
            hosts,
            vms,
            clusters,
            weights,
            orig_host,
            members,
        }
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn vms(&self) -> &[Vm] {
        &self.vms
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// Host index the VM at `vm` was originally placed on, if any.
    pub fn orig_host(&self, vm: usize) -> Option<usize> {
        self.orig_host.get(vm).copied().flatten()
    }

    /// Member VM indices of the cluster at `cluster`.
    pub fn members(&self, cluster: usize) -> &[usize] {
        self.members.get(cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn host_index(&self, id: &str) -> Option<usize> {
        self.hosts.iter().position(|h| h.id == id)
    }

    pub fn vm_index(&self, id: &str) -> Option<usize> {
        self.vms.iter().position(|v| v.id == id)
    }

    /// Number of VMs that have a recorded origin host.
    pub fn placed_vm_count(&self) -> usize {
        self.orig_host.iter().filter(|h| h.is_some()).count()
    }
}
