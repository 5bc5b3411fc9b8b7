//! Status poller
//!
//! The secondary source of truth: a fixed-cadence `<tool> status` invocation.
//! The first round fires immediately at startup. A round whose command fails
//! is skipped silently — transient poll failures never surface to the user,
//! the previous state simply stands.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::Msg;
use crate::command::CommandRunner;
use crate::config::Config;
use crate::status::parse_status;

/// Poll loop driven by the configured interval. Exits when the supervisor
/// channel closes.
pub(crate) async fn run(config: Config, runner: Arc<dyn CommandRunner>, tx: mpsc::UnboundedSender<Msg>) {
  let mut ticker = tokio::time::interval(config.poll_interval());
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    ticker.tick().await;
    if tx.is_closed() {
      break;
    }
    poll_once(&config, runner.as_ref(), &tx).await;
  }
}

/// One status round: run the command, parse, report. A failed command or a
/// closed channel is a silent no-op.
pub(crate) async fn poll_once(config: &Config, runner: &dyn CommandRunner, tx: &mpsc::UnboundedSender<Msg>) {
  let argv = vec![config.tool_program(), "status".to_string()];
  let out = runner.run(&argv).await;
  if !out.success {
    tracing::debug!(stderr = %out.stderr, "status poll failed, keeping previous state");
    return;
  }

  let _ = tx.send(Msg::Status(parse_status(&out.stdout)));
}
