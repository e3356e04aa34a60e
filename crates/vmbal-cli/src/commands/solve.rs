use std::time::Duration;

use anyhow::bail;
use tracing::debug;

use vmbal_core::{OutputFormat, SpecNormalizer, VmbalConfig};
use vmbal_model::{MicrolpEngine, SolveSettings};

use super::{load_config, read_input};

pub fn solve(
    input: &str,
    config: Option<&str>,
    format: Option<&str>,
    time_limit: Option<f64>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let content = read_input(input)?;
    println!("{}", render(&content, &config, format, time_limit)?);
    Ok(())
}

/// Solve `content` and render the plan. CLI flags win over the config file.
pub fn render(
    content: &str,
    config: &VmbalConfig,
    format: Option<&str>,
    time_limit: Option<f64>,
) -> anyhow::Result<String> {
    let format: OutputFormat = match format {
        Some(f) => f.parse()?,
        None => config.output.format,
    };

    let mut settings = SolveSettings::default();
    match time_limit {
        Some(secs) if !secs.is_finite() || secs <= 0.0 => {
            bail!("--time-limit must be a positive number of seconds, got {secs}")
        }
        Some(secs) => settings = settings.with_time_limit(Duration::from_secs_f64(secs)),
        None => settings.time_limit = config.time_limit(),
    }
    debug!(?format, time_limit = ?settings.time_limit, "solve settings");

    let normalizer = SpecNormalizer::new().with_default_weights(config.default_weights());
    let problem = normalizer.normalize_json(content)?;
    let plan = vmbal_model::optimize(&problem, &MicrolpEngine::new(), &settings)?;

    let out = match format {
        OutputFormat::Json => plan.to_json(config.output.pretty)?,
        OutputFormat::Text => vmbal_model::format_plan(&problem, &plan),
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "hosts": [
            {"id": "H1", "cpu_cap": 10, "mem_cap": 100},
            {"id": "H2", "cpu_cap": 10, "mem_cap": 100}
        ],
        "vms": [
            {"id": "A", "cpu": 4, "mem": 1},
            {"id": "B", "cpu": 4, "mem": 1},
            {"id": "C", "cpu": 2, "mem": 1},
            {"id": "D", "cpu": 2, "mem": 1}
        ],
        "initial_placement": {"H1": ["A", "B", "C"], "H2": ["D"]}
    }"#;

    #[test]
    fn test_render_json() {
        let out = render(INPUT, &VmbalConfig::default(), None, None).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["status"], "Optimal");
        assert_eq!(v["assignment"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_render_text() {
        let out = render(INPUT, &VmbalConfig::default(), Some("text"), Some(30.0)).unwrap();
        assert!(out.contains("vmbal Rebalance Plan"));
        assert!(out.contains("Optimal"));
    }

    #[test]
    fn test_config_weights_apply_when_input_has_none() {
        let config = VmbalConfig::from_toml_str("[weights]\nbeta = 0.1\n").unwrap();
        let out = render(INPUT, &config, Some("json"), None).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        let moved = v["migration"].as_object().unwrap().values().filter(|m| *m == 1).count();
        assert_eq!(moved, 1);
    }

    #[test]
    fn test_rejects_bad_flags() {
        let config = VmbalConfig::default();
        assert!(render(INPUT, &config, Some("yaml"), None).is_err());
        assert!(render(INPUT, &config, None, Some(0.0)).is_err());
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        let err = render(r#"{"vms": [{"id": "V1"}]}"#, &VmbalConfig::default(), None, None).unwrap_err();
        assert!(err.downcast_ref::<vmbal_core::ValidationError>().is_some());
        assert!(err.to_string().contains("missing required field"));
    }
}
