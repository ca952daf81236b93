use std::path::Path;

use anyhow::{Context, Result};

use super::types::Config;

/// Name of the optional per-project config file.
pub const CONFIG_FILE: &str = ".txtprep.yaml";

/// Load `.txtprep.yaml` from `dir`, falling back to defaults when absent.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}
