//! Human-readable plan formatting.

use vmbal_core::{RebalancePlan, RebalanceProblem, audit};

pub fn format_plan(problem: &RebalanceProblem, plan: &RebalancePlan) -> String {
    let mut out = String::new();
    let w = problem.weights();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  vmbal Rebalance Plan                    ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Status:    {:<29}║\n", plan.status.label()));
    out.push_str(&format!("║  Objective: {:<29}║\n", fmt_opt(plan.objective)));
    out.push_str(&format!(
        "║  Weights:   {:<29}║\n",
        format!("a={} b={} g={}", w.alpha, w.beta, w.gamma)
    ));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    if !plan.is_solved() {
        out.push_str(&format!(
            "No plan: {} hosts, {} VMs, {} clusters.\n",
            problem.hosts().len(),
            problem.vms().len(),
            problem.clusters().len()
        ));
        return out;
    }

    out.push_str(&format!(
        "Utilization (spread {} .. {}):\n",
        fmt_opt(plan.u_min),
        fmt_opt(plan.u_max)
    ));
    for (host, util) in &plan.host_util {
        out.push_str(&format!("  {host:<16} {:>6.1}%\n", util * 100.0));
    }
    out.push('\n');

    let moved = plan.migration_count();
    out.push_str(&format!("Assignment ({moved} migrated):\n"));
    for p in &plan.assignment {
        let vi = problem.vm_index(&p.vm);
        let from = vi
            .and_then(|vi| problem.orig_host(vi))
            .map(|hi| problem.hosts()[hi].id.as_str());
        let marker = if plan.migration.get(&p.vm) == Some(&1) {
            "→"
        } else {
            " "
        };
        match from {
            Some(from) if from != p.host => {
                out.push_str(&format!("  {marker} {:<16} {from} → {}\n", p.vm, p.host));
            }
            Some(_) => out.push_str(&format!("  {marker} {:<16} {}\n", p.vm, p.host)),
            None => out.push_str(&format!("  {marker} {:<16} {} (new)\n", p.vm, p.host)),
        }
    }

    if !plan.soft_violation.is_empty() {
        out.push_str("\nCluster dispersion shortfall:\n");
        for (cluster, s) in &plan.soft_violation {
            out.push_str(&format!("  • {cluster:<16} {s}\n"));
        }
    }

    let findings = audit(problem, plan);
    if !findings.is_empty() {
        out.push_str("\n❌ AUDIT FINDINGS:\n\n");
        for (i, f) in findings.iter().enumerate() {
            out.push_str(&format!("  {}. {f}\n", i + 1));
        }
    }

    out
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "null".to_string(),
    }
}
