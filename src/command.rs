//! External command execution
//!
//! Everything the supervisor does to the outside world goes through
//! [`CommandRunner`]: a single async seam that runs an argument vector to
//! completion and reports `(success, stdout, stderr)` without ever returning
//! an error. A binary that cannot be spawned is indistinguishable from one
//! that exited nonzero — both normalize to `success = false` with the
//! diagnostic in `stderr`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Result of running an external command to completion.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  /// A failed invocation that never produced process output.
  pub fn failed(diagnostic: impl Into<String>) -> Self {
    Self {
      success: false,
      stdout: String::new(),
      stderr: diagnostic.into(),
    }
  }
}

/// Async command execution seam.
///
/// The supervisor core and the status poller only ever see this trait, so
/// tests drive the full state machine with a scripted runner instead of real
/// processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
  /// Run `argv` to completion and capture its output. Must not fail: any
  /// launch error is folded into the returned [`CommandOutput`].
  async fn run(&self, argv: &[String]) -> CommandOutput;
}

/// [`CommandRunner`] backed by real processes via `tokio::process`.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
  async fn run(&self, argv: &[String]) -> CommandOutput {
    let Some((program, args)) = argv.split_first() else {
      return CommandOutput::failed("empty command line");
    };

    tracing::debug!(command = ?argv, "running command");

    match Command::new(program)
      .args(args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .output()
      .await
    {
      Ok(output) => CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      },
      Err(e) => CommandOutput::failed(format!("failed to launch {program}: {e}")),
    }
  }
}

/// Spawn `argv` detached, without waiting for it.
///
/// Used for terminal launches whose outcome the supervisor deliberately does
/// not track. The child is reaped by a background task; its exit status is
/// intentionally discarded.
pub fn spawn_detached(argv: &[String]) -> anyhow::Result<()> {
  let Some((program, args)) = argv.split_first() else {
    anyhow::bail!("empty command line");
  };

  let mut child = Command::new(program)
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()?;

  tokio::spawn(async move {
    // Reap only; the result is discarded on purpose.
    let _ = child.wait().await;
  });

  Ok(())
}
