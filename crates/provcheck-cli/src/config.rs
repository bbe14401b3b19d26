//! `workflow_config.json` and flag parsing helpers.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The workflow description written next to a benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub configurations: Vec<String>,
    #[serde(default)]
    pub benchmark: Option<String>,
    #[serde(default)]
    pub configuration_to_parameter_file: BTreeMap<String, String>,
}

impl WorkflowConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read workflow config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse workflow config {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            tools = config.tools.len(),
            configurations = config.configurations.len(),
            "loaded workflow config"
        );
        Ok(config)
    }
}

/// Tools from the flags, else from the workflow config.
pub fn resolve_tools(flags: &[String], config: Option<&WorkflowConfig>) -> Result<Vec<String>> {
    if !flags.is_empty() {
        return Ok(flags.to_vec());
    }
    match config {
        Some(cfg) if !cfg.tools.is_empty() => Ok(cfg.tools.clone()),
        Some(_) => Err(anyhow!("workflow config lists no tools; pass --tool")),
        None => Err(anyhow!("no tools given; pass --tool or --config")),
    }
}

/// Parse `name=value` (value must be numeric).
pub fn parse_fixed(raw: &str) -> Result<(String, f64)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("empty parameter name in `{raw}`"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("`{}` in `{raw}` is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}
