//! Supervisor configuration
//!
//! Loaded from `$XDG_CONFIG_HOME/machdock/config.yaml` when present, with
//! full defaults otherwise. Every field is optional in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

/// How `<tool> start` is invoked.
///
/// The start step may need privilege confirmation. Deployments where polkit
/// can prompt on its own use `elevated`; deployments where confirmation must
/// happen in an interactive terminal use `terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartStrategy {
  /// Run `<elevator> <tool> start` directly and observe its completion.
  #[default]
  Elevated,
  /// Run `<terminal> -- <tool> start` and observe the terminal's exit.
  Terminal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Machine name reported by machined and filtered on bus events.
  pub machine_name: String,
  /// The managed CLI tool (`<tool> status|start|stop|shell`). Resolved on
  /// the search path before use; a bare name falls through to $PATH at
  /// spawn time.
  pub tool: String,
  /// Privilege-escalation wrapper for the `elevated` start strategy.
  pub elevator: String,
  /// Deployment-time choice between the two start invocation variants.
  pub start_strategy: StartStrategy,
  /// Cadence of the status poll, in seconds.
  pub poll_interval_secs: u64,
  /// How long the transient error indicator stays lit, in seconds.
  pub error_display_secs: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      machine_name: "machbox".to_string(),
      tool: "machbox".to_string(),
      elevator: "pkexec".to_string(),
      start_strategy: StartStrategy::default(),
      poll_interval_secs: 5,
      error_display_secs: 3,
    }
  }
}

impl Config {
  /// The config file location under the XDG config directory.
  pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("machdock").join("config.yaml"))
  }

  /// Load the configuration, falling back to defaults when no file exists.
  pub fn load() -> anyhow::Result<Self> {
    match Self::config_path() {
      Some(path) => Self::load_from(&path),
      None => Ok(Self::default()),
    }
  }

  /// Load from an explicit path; a missing file yields the defaults, an
  /// unreadable or invalid file is an error.
  pub fn load_from(path: &Path) -> anyhow::Result<Self> {
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read config at {}", path.display()))?;
    serde_yaml::from_str(&content)
      .map_err(|e| anyhow!("failed to parse config at {}: {e}", path.display()))
  }

  /// Resolve the tool binary on the search path, keeping the bare name when
  /// it does not resolve (the spawn will then report the failure normally).
  pub fn tool_program(&self) -> String {
    which::which(&self.tool)
      .map(|p| p.display().to_string())
      .unwrap_or_else(|_| self.tool.clone())
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  pub fn error_display(&self) -> Duration {
    Duration::from_secs(self.error_display_secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.machine_name, "machbox");
    assert_eq!(config.tool, "machbox");
    assert_eq!(config.elevator, "pkexec");
    assert_eq!(config.start_strategy, StartStrategy::Elevated);
    assert_eq!(config.poll_interval(), Duration::from_secs(5));
    assert_eq!(config.error_display(), Duration::from_secs(3));
  }

  #[test]
  fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("config.yaml")).unwrap();
    assert_eq!(config.machine_name, Config::default().machine_name);
  }

  #[test]
  fn test_partial_file_keeps_defaults_for_absent_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "machine_name: devbox\npoll_interval_secs: 10\n").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.machine_name, "devbox");
    assert_eq!(config.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.tool, "machbox");
    assert_eq!(config.start_strategy, StartStrategy::Elevated);
  }

  #[test]
  fn test_start_strategy_kebab_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "start_strategy: terminal\n").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.start_strategy, StartStrategy::Terminal);
  }

  #[test]
  fn test_invalid_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "poll_interval_secs: not-a-number\n").unwrap();

    assert!(Config::load_from(&path).is_err());
  }

  #[test]
  fn test_tool_program_falls_back_to_bare_name() {
    let config = Config {
      tool: "no-such-tool-xyz123".to_string(),
      ..Default::default()
    };
    assert_eq!(config.tool_program(), "no-such-tool-xyz123");
  }

  #[test]
  fn test_tool_program_resolves_on_path() {
    let config = Config {
      tool: "sh".to_string(),
      ..Default::default()
    };
    assert!(config.tool_program().ends_with("sh"));
  }
}
