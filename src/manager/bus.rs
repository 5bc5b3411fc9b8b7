//! machined signal watcher
//!
//! The authoritative source of truth: `MachineNew` / `MachineRemoved` signals
//! from systemd-machined on the system bus. Subscription is attempted once at
//! supervisor construction; any failure (no system bus, machined absent,
//! match registration rejected) degrades silently to poll-only operation —
//! the supervisor keeps working, just without push notifications.
//!
//! The watcher is a dumb pipe: it forwards every machine name it sees and
//! leaves the exact-name filter to the supervisor core.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, MatchRule, MessageStream};

use super::Msg;

const MACHINED_BUS_NAME: &str = "org.freedesktop.machine1";
const MACHINED_PATH: &str = "/org/freedesktop/machine1";
const MACHINED_INTERFACE: &str = "org.freedesktop.machine1.Manager";

/// Subscribe to machined lifecycle signals. Returns the watcher task on
/// success, `None` when the bus is unavailable (poll-only fallback).
pub(crate) async fn subscribe(tx: mpsc::UnboundedSender<Msg>) -> Option<JoinHandle<()>> {
  match try_subscribe(tx).await {
    Ok(handle) => Some(handle),
    Err(e) => {
      tracing::warn!("machined signal watch unavailable, falling back to polling: {e:#}");
      None
    }
  }
}

async fn try_subscribe(tx: mpsc::UnboundedSender<Msg>) -> anyhow::Result<JoinHandle<()>> {
  let conn = Connection::system().await?;

  let new_stream = MessageStream::for_match_rule(signal_rule("MachineNew")?, &conn, Some(16)).await?;
  let removed_stream = MessageStream::for_match_rule(signal_rule("MachineRemoved")?, &conn, Some(16)).await?;

  // The streams hold the match registrations; dropping them (when the task
  // ends or is aborted) deregisters from the bus.
  Ok(tokio::spawn(watch(new_stream, removed_stream, tx)))
}

fn signal_rule(member: &'static str) -> anyhow::Result<MatchRule<'static>> {
  Ok(
    MatchRule::builder()
      .msg_type(zbus::message::Type::Signal)
      .sender(MACHINED_BUS_NAME)?
      .path(MACHINED_PATH)?
      .interface(MACHINED_INTERFACE)?
      .member(member)?
      .build(),
  )
}

async fn watch(
  mut new_stream: MessageStream,
  mut removed_stream: MessageStream,
  tx: mpsc::UnboundedSender<Msg>,
) {
  loop {
    let msg = tokio::select! {
      msg = new_stream.next() => match msg {
        Some(Ok(msg)) => machine_name(&msg).map(Msg::MachineNew),
        Some(Err(e)) => {
          tracing::debug!("machined signal stream error: {e}");
          None
        }
        None => break,
      },
      msg = removed_stream.next() => match msg {
        Some(Ok(msg)) => machine_name(&msg).map(Msg::MachineRemoved),
        Some(Err(e)) => {
          tracing::debug!("machined signal stream error: {e}");
          None
        }
        None => break,
      },
    };

    if let Some(msg) = msg
      && tx.send(msg).is_err()
    {
      // Supervisor gone; stop watching.
      break;
    }
  }
}

/// Extract the machine name from a `MachineNew`/`MachineRemoved` signal body
/// (`(s name, o machine_path)`).
fn machine_name(msg: &zbus::Message) -> Option<String> {
  msg
    .body()
    .deserialize::<(String, OwnedObjectPath)>()
    .ok()
    .map(|(name, _)| name)
}
