use std::path::Path;

use anyhow::{Context, bail};

use vmbal_core::VmbalConfig;

pub fn init(path: &str, force: bool) -> anyhow::Result<()> {
    let output = Path::new(path);
    write_scaffold(output, force)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

pub fn write_scaffold(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    let content = VmbalConfig::scaffold().to_toml_string()?;
    std::fs::write(output, content)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}
