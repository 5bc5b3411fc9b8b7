//! Headless supervisor agent
//!
//! Minimal stand-in for a presentation layer: construct the supervisor, log
//! every observable state transition, and tear down on Ctrl-C. Real frontends
//! subscribe to the same flags and call the same three actions.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use machdock::{Config, MachineManager, SystemRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("machdock=info")))
    .init();

  let config = Config::load()?;
  tracing::info!(
    machine = %config.machine_name,
    strategy = ?config.start_strategy,
    "starting machine supervisor"
  );

  let manager = MachineManager::new(config, Arc::new(SystemRunner)).await;

  let state = manager.state();
  let mut container = state.container_running.subscribe();
  let mut broker = state.broker_running.subscribe();
  let mut transitioning = state.transitioning.subscribe();
  let mut error = state.error.subscribe();

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      Ok(()) = container.changed() => {
        tracing::info!(running = *container.borrow_and_update(), "container state changed");
      }
      Ok(()) = broker.changed() => {
        tracing::info!(running = *broker.borrow_and_update(), "broker proxy state changed");
      }
      Ok(()) = transitioning.changed() => {
        tracing::info!(transitioning = *transitioning.borrow_and_update(), "transition state changed");
      }
      Ok(()) = error.changed() => {
        tracing::info!(error = *error.borrow_and_update(), "error indicator changed");
      }
    }
  }

  tracing::info!("shutting down");
  manager.destroy();
  Ok(())
}
