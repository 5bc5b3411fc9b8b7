//! Status output parsing
//!
//! `<tool> status` prints free-form text; the supervisor recognizes exactly
//! two labeled lines, order-independent and independently optional:
//!
//! ```text
//! Container:      running
//! Broker proxy:   stopped
//! ```
//!
//! The two labels carry different absence semantics on purpose: a missing
//! `Container:` line means "unknown, keep the previous value", while a
//! missing or non-`running` `Broker proxy:` line means the proxy is down.

use std::sync::LazyLock;

use regex::Regex;

static CONTAINER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^Container:\s+(\w+)").expect("container status pattern"));

static BROKER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^Broker proxy:\s+(\w+)").expect("broker status pattern"));

/// One round of parsed status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
  /// `Some(running)` when the `Container:` line was present, `None` when it
  /// was absent and container state should be left untouched.
  pub container: Option<bool>,
  /// True only when a `Broker proxy:` line was present with the value
  /// `running`.
  pub broker: bool,
}

/// Extract the recognized fields from status stdout.
pub fn parse_status(stdout: &str) -> StatusReport {
  let container = CONTAINER_RE
    .captures(stdout)
    .map(|caps| &caps[1] == "running");

  let broker = BROKER_RE
    .captures(stdout)
    .is_some_and(|caps| &caps[1] == "running");

  StatusReport { container, broker }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_running_container_stopped_broker() {
    let report = parse_status("Container: running\nBroker proxy: stopped");
    assert_eq!(report.container, Some(true));
    assert!(!report.broker);
  }

  #[test]
  fn test_parse_both_running() {
    let report = parse_status("Container:      running\nBroker proxy:   running");
    assert_eq!(report.container, Some(true));
    assert!(report.broker);
  }

  #[test]
  fn test_parse_stopped_container() {
    let report = parse_status("Container: stopped");
    assert_eq!(report.container, Some(false));
    assert!(!report.broker);
  }

  #[test]
  fn test_unknown_container_value_means_not_running() {
    // Present-but-unexpected is distinct from absent: the line was seen, so
    // the container is reported as not running.
    let report = parse_status("Container: degraded");
    assert_eq!(report.container, Some(false));
  }

  #[test]
  fn test_absent_container_line_is_none() {
    let report = parse_status("Broker proxy: running");
    assert_eq!(report.container, None);
    assert!(report.broker);
  }

  #[test]
  fn test_no_recognizable_lines() {
    let report = parse_status("Status: not initialized\nRun 'init' to get started.");
    assert_eq!(report.container, None);
    assert!(!report.broker);
  }

  #[test]
  fn test_labels_are_case_sensitive() {
    let report = parse_status("container: running\nBROKER PROXY: running");
    assert_eq!(report.container, None);
    assert!(!report.broker);
  }

  #[test]
  fn test_labels_match_only_at_line_start() {
    let report = parse_status("  Container: running");
    assert_eq!(report.container, None);
  }

  #[test]
  fn test_lines_are_order_independent() {
    let report = parse_status("Broker proxy: running\nMachine: devbox\nContainer: running");
    assert_eq!(report.container, Some(true));
    assert!(report.broker);
  }

  #[test]
  fn test_surrounding_noise_is_ignored() {
    let stdout = "Root:    /home/u/.local/share/machbox\n\
                  Rootfs:  /home/u/.local/share/machbox/rootfs\n\
                  Container: running\n\
                  Broker proxy: stopped\n";
    let report = parse_status(stdout);
    assert_eq!(report.container, Some(true));
    assert!(!report.broker);
  }
}
