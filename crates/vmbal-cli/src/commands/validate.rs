use vmbal_core::SpecNormalizer;

use super::read_input;

pub fn validate(input: &str) -> anyhow::Result<()> {
    let content = read_input(input)?;
    println!("{}", summarize(&content)?);
    Ok(())
}

pub fn summarize(content: &str) -> anyhow::Result<String> {
    let problem = SpecNormalizer::new().normalize_json(content)?;
    let w = problem.weights();
    let exclusive = problem.clusters().iter().filter(|c| c.hard_excl).count();

    let mut out = String::from("✓ Input is valid\n");
    out.push_str(&format!("  hosts:    {}\n", problem.hosts().len()));
    out.push_str(&format!(
        "  vms:      {} ({} placed)\n",
        problem.vms().len(),
        problem.placed_vm_count()
    ));
    out.push_str(&format!(
        "  clusters: {} ({exclusive} exclusive)\n",
        problem.clusters().len()
    ));
    out.push_str(&format!(
        "  weights:  alpha={} beta={} gamma={}",
        w.alpha, w.beta, w.gamma
    ));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let out = summarize(
            r#"{
            "hosts": [{"id": "H1", "cpu_cap": 8, "mem_cap": 8}],
            "vms": [{"id": "V1", "cpu": 1, "mem": 1, "cluster": "C"}, {"id": "V2", "cpu": 1, "mem": 1}],
            "initial_placement": {"H1": ["V1"]},
            "clusters": [{"id": "C", "size": 1, "hard_excl": true}]
        }"#,
        )
        .unwrap();
        assert!(out.contains("hosts:    1"));
        assert!(out.contains("vms:      2 (1 placed)"));
        assert!(out.contains("clusters: 1 (1 exclusive)"));
        assert!(out.contains("alpha=1 beta=1 gamma=0"));
    }

    #[test]
    fn test_summary_rejects_unknown_host() {
        let err = summarize(r#"{"initial_placement": {"ghost": []}}"#).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
