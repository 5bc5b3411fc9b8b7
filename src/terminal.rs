//! Terminal emulator discovery
//!
//! Shell-open and terminal-wrapped starts need an interactive terminal. The
//! `$TERMINAL` environment variable names a preferred emulator and wins when
//! it resolves on the search path; otherwise the built-in candidates are
//! tried in order. Pure apart from path lookups.

use std::path::PathBuf;

/// Candidate emulators, in order of preference.
pub const TERMINALS: &[&str] = &["ptyxis", "kgx", "gnome-terminal", "xterm"];

/// Resolve the terminal emulator to use, if any.
pub fn find_terminal() -> Option<PathBuf> {
  locate(std::env::var("TERMINAL").ok().as_deref(), TERMINALS)
}

fn locate(preferred: Option<&str>, candidates: &[&str]) -> Option<PathBuf> {
  if let Some(name) = preferred
    && !name.is_empty()
    && let Ok(path) = which::which(name)
  {
    return Some(path);
  }

  candidates.iter().find_map(|term| which::which(term).ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_candidate_order() {
    assert_eq!(TERMINALS.first(), Some(&"ptyxis"));
    assert!(TERMINALS.contains(&"xterm"));
  }

  #[test]
  fn test_preferred_wins_when_resolvable() {
    // `sh` exists everywhere; it stands in for a resolvable $TERMINAL.
    let path = locate(Some("sh"), &["also-not-a-terminal"]);
    assert!(path.is_some());
    assert!(path.unwrap().ends_with("sh"));
  }

  #[test]
  fn test_unresolvable_preferred_falls_through_to_candidates() {
    let path = locate(Some("no-such-terminal-xyz123"), &["sh"]);
    assert!(path.is_some());
    assert!(path.unwrap().ends_with("sh"));
  }

  #[test]
  fn test_empty_preferred_is_ignored() {
    let path = locate(Some(""), &["sh"]);
    assert!(path.is_some());
  }

  #[test]
  fn test_none_found() {
    let path = locate(None, &["no-such-terminal-a", "no-such-terminal-b"]);
    assert!(path.is_none());
  }

  #[test]
  fn test_candidates_tried_in_order() {
    let path = locate(None, &["no-such-terminal-xyz123", "sh", "ls"]);
    assert!(path.unwrap().ends_with("sh"));
  }
}
