//! Agent configuration stored in `molpilot.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Agent configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the Anthropic Messages API.
    pub model: String,

    /// Maximum tokens the model may generate per reply.
    pub max_tokens: u32,

    /// Base URL of the Anthropic-compatible API.
    pub api_base: String,

    /// HTTP timeout for one model call, in seconds.
    pub request_timeout_secs: u64,

    /// Command line used to launch the PyMOL child process.
    pub pymol_command: Vec<String>,

    /// Maximum time to wait for one PyMOL command to finish, in seconds.
    pub command_timeout_secs: u64,

    /// Grace period for PyMOL to exit after `quit` before it is killed.
    pub shutdown_timeout_secs: u64,

    /// Truncate captured command output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 2048,
            api_base: "https://api.anthropic.com".to_string(),
            request_timeout_secs: 120,
            pymol_command: vec!["pymol".to_string(), "-cq".to_string(), "-p".to_string()],
            command_timeout_secs: 300,
            shutdown_timeout_secs: 10,
            output_limit_bytes: 100_000,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be > 0"));
        }
        if self.api_base.trim().is_empty() {
            return Err(anyhow!("api_base must be non-empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.pymol_command.is_empty() || self.pymol_command[0].trim().is_empty() {
            return Err(anyhow!("pymol_command must be a non-empty array"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(anyhow!("shutdown_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
