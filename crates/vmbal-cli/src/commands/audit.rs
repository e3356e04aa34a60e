use anyhow::{Context, bail};

use vmbal_core::{RebalancePlan, SpecNormalizer};

use super::read_input;

pub fn audit(input: &str, plan: &str) -> anyhow::Result<()> {
    let content = read_input(input)?;
    let plan = read_input(plan)?;
    let findings = check(&content, &plan)?;

    if findings.is_empty() {
        println!("✓ Plan passes all checks");
        return Ok(());
    }
    for f in &findings {
        println!("  • {f}");
    }
    bail!("plan failed audit with {} finding(s)", findings.len())
}

/// Findings rendered as lines, empty when the plan is consistent.
pub fn check(input: &str, plan: &str) -> anyhow::Result<Vec<String>> {
    let problem = SpecNormalizer::new().normalize_json(input)?;
    let plan = RebalancePlan::from_json_str(plan).context("failed to parse plan")?;
    if !plan.is_solved() {
        bail!("plan has status {} and nothing to audit", plan.status);
    }
    Ok(vmbal_core::audit(&problem, &plan)
        .iter()
        .map(ToString::to_string)
        .collect())
}
