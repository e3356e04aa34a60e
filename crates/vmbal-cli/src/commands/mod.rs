pub mod audit;
pub mod config;
pub mod solve;
pub mod validate;

use std::io::Read;
use std::path::Path;

use anyhow::Context;

use vmbal_core::VmbalConfig;

/// Config picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "vmbal.toml";

/// Read a file, or stdin when `path` is "-".
pub fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
}

pub fn load_config(path: Option<&str>) -> anyhow::Result<VmbalConfig> {
    let path = match path {
        Some(p) => Path::new(p),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG);
            if !fallback.exists() {
                return Ok(VmbalConfig::default());
            }
            fallback
        }
    };
    VmbalConfig::from_file(path).with_context(|| format!("failed to load {}", path.display()))
}
