//! Machine lifecycle supervisor
//!
//! [`MachineManager`] owns the observable state and is its only writer. Two
//! independent sources feed it asynchronously — machined bus signals
//! (authoritative) and status polls (fallback) — alongside user start/stop
//! requests and their completions. Everything is funneled as [`Msg`] values
//! into one core task, so state mutation and its change notification are a
//! single synchronous step and no observer can see a torn update.
//!
//! The tie-break between the two sources is structural: while a start or
//! stop is in flight (`transitioning`), poll results never write
//! `container_running`; only the bus event handlers (and action failure)
//! end a transition. A stale poll racing a signal therefore cannot revert
//! the primary state.

mod bus;
mod poller;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::command::{self, CommandRunner};
use crate::config::{Config, StartStrategy};
use crate::state::MachineState;
use crate::status::StatusReport;
use crate::terminal;

/// User-initiated lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
  Start,
  Stop,
}

impl Action {
  fn name(self) -> &'static str {
    match self {
      Self::Start => "start",
      Self::Stop => "stop",
    }
  }
}

/// Everything that can reach the supervisor core. All state mutation happens
/// while handling one of these.
pub(crate) enum Msg {
  /// User asked for a start or stop.
  Request(Action),
  /// A start/stop command finished (or could not be assembled/launched).
  Finished {
    action: Action,
    success: bool,
    stderr: String,
  },
  /// A successful status poll round.
  Status(StatusReport),
  /// machined announced a machine; unfiltered, may be someone else's.
  MachineNew(String),
  /// machined removed a machine; unfiltered.
  MachineRemoved(String),
}

struct Tasks {
  core: JoinHandle<()>,
  poller: JoinHandle<()>,
  bus: Option<JoinHandle<()>>,
}

/// Lifecycle supervisor for one named machine.
///
/// Constructed once per session. [`destroy`](Self::destroy) (or drop) tears
/// down the poll loop, the bus subscription, and any pending error timer;
/// command completions that arrive afterwards are discarded.
pub struct MachineManager {
  config: Config,
  state: Arc<MachineState>,
  tx: mpsc::UnboundedSender<Msg>,
  tasks: Mutex<Option<Tasks>>,
}

impl MachineManager {
  /// Construct the supervisor: subscribe to machined signals (best-effort),
  /// start the poll loop, and fire the immediate first poll.
  pub async fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let bus = bus::subscribe(tx.clone()).await;
    let bus_active = bus.is_some();
    Self::assemble(config, runner, tx, rx, bus, bus_active)
  }

  fn assemble(
    config: Config,
    runner: Arc<dyn CommandRunner>,
    tx: mpsc::UnboundedSender<Msg>,
    rx: mpsc::UnboundedReceiver<Msg>,
    bus: Option<JoinHandle<()>>,
    bus_active: bool,
  ) -> Self {
    let state = Arc::new(MachineState::new());

    let poller = tokio::spawn(poller::run(config.clone(), runner.clone(), tx.clone()));

    let core = Core {
      config: config.clone(),
      runner,
      state: state.clone(),
      tx: tx.clone(),
      bus_active,
      error_deadline: None,
    };
    let core = tokio::spawn(core.run(rx));

    Self {
      config,
      state,
      tx,
      tasks: Mutex::new(Some(Tasks { core, poller, bus })),
    }
  }

  /// Construct without a bus subscription; used by tests to pin the
  /// watcher mode.
  #[cfg(test)]
  fn detached(config: Config, runner: Arc<dyn CommandRunner>, bus_active: bool) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self::assemble(config, runner, tx, rx, None, bus_active)
  }

  /// The observable surface; subscribe to individual flags from here.
  pub fn state(&self) -> &MachineState {
    &self.state
  }

  pub fn container_running(&self) -> bool {
    self.state.container_running.get()
  }

  pub fn broker_running(&self) -> bool {
    self.state.broker_running.get()
  }

  pub fn transitioning(&self) -> bool {
    self.state.transitioning.get()
  }

  pub fn error(&self) -> bool {
    self.state.error.get()
  }

  /// Request a machine start. No-op while running or transitioning.
  pub fn start(&self) {
    let _ = self.tx.send(Msg::Request(Action::Start));
  }

  /// Request a machine stop. No-op while stopped or transitioning.
  pub fn stop(&self) {
    let _ = self.tx.send(Msg::Request(Action::Stop));
  }

  /// Open `<tool> shell` in a terminal, detached. Stateless: no flag is
  /// touched, and failure is a diagnostic log only.
  pub fn open_shell(&self) {
    let Some(term) = terminal::find_terminal() else {
      tracing::error!("no terminal emulator found");
      return;
    };

    let argv = vec![
      term.display().to_string(),
      "--".to_string(),
      self.config.tool_program(),
      "shell".to_string(),
    ];
    if let Err(e) = command::spawn_detached(&argv) {
      tracing::error!("failed to launch terminal: {e}");
    }
  }

  /// Tear down the supervisor. Idempotent; after the first call no further
  /// state change or notification occurs, and late command completions are
  /// discarded via the closed channel.
  pub fn destroy(&self) {
    let Some(tasks) = self.tasks.lock().take() else {
      return;
    };

    tracing::debug!("tearing down machine supervisor");
    tasks.core.abort();
    tasks.poller.abort();
    if let Some(bus) = tasks.bus {
      bus.abort();
    }
  }
}

impl Drop for MachineManager {
  fn drop(&mut self) {
    self.destroy();
  }
}

/// The single owner of all state writes.
struct Core {
  config: Config,
  runner: Arc<dyn CommandRunner>,
  state: Arc<MachineState>,
  tx: mpsc::UnboundedSender<Msg>,
  bus_active: bool,
  error_deadline: Option<Instant>,
}

impl Core {
  async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Msg>) {
    loop {
      tokio::select! {
        msg = rx.recv() => match msg {
          Some(msg) => self.handle(msg),
          None => break,
        },
        () = error_expiry(self.error_deadline) => {
          self.state.error.set(false);
          self.error_deadline = None;
        }
      }
    }
  }

  fn handle(&mut self, msg: Msg) {
    match msg {
      Msg::Request(action) => self.request(action),
      Msg::Finished {
        action,
        success,
        stderr,
      } => self.finished(action, success, &stderr),
      Msg::Status(report) => self.apply_status(report),
      Msg::MachineNew(name) => {
        if name == self.config.machine_name {
          tracing::debug!(machine = %name, "machine appeared");
          self.state.container_running.set(true);
          self.state.transitioning.set(false);
        }
      }
      Msg::MachineRemoved(name) => {
        if name == self.config.machine_name {
          tracing::debug!(machine = %name, "machine removed");
          self.state.container_running.set(false);
          self.state.broker_running.set(false);
          self.state.transitioning.set(false);
        }
      }
    }
  }

  fn request(&mut self, action: Action) {
    let running = self.state.container_running.get();
    let wrong_state = match action {
      Action::Start => running,
      Action::Stop => !running,
    };
    if wrong_state || self.state.transitioning.get() {
      tracing::debug!(action = action.name(), "ignoring request in current state");
      return;
    }

    self.state.transitioning.set(true);

    let argv = match self.action_argv(action) {
      Ok(argv) => argv,
      Err(reason) => {
        // Could not even assemble the invocation (no terminal); same path
        // as a failed command.
        self.finished(action, false, &reason);
        return;
      }
    };

    let runner = self.runner.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let out = runner.run(&argv).await;
      // Fails after teardown; the result is then discarded.
      let _ = tx.send(Msg::Finished {
        action,
        success: out.success,
        stderr: out.stderr,
      });
    });
  }

  fn action_argv(&self, action: Action) -> Result<Vec<String>, String> {
    let tool = self.config.tool_program();
    match action {
      Action::Stop => Ok(vec![tool, "stop".to_string()]),
      Action::Start => match self.config.start_strategy {
        StartStrategy::Elevated => Ok(vec![self.config.elevator.clone(), tool, "start".to_string()]),
        StartStrategy::Terminal => match terminal::find_terminal() {
          Some(term) => Ok(vec![
            term.display().to_string(),
            "--".to_string(),
            tool,
            "start".to_string(),
          ]),
          None => Err("no terminal emulator found".to_string()),
        },
      },
    }
  }

  fn finished(&mut self, action: Action, success: bool, stderr: &str) {
    if success {
      if self.bus_active {
        // The machined signal resolves the transition; the poll below is
        // only a fallback for broker state and missed signals.
        tracing::debug!(action = action.name(), "action succeeded, awaiting machined signal");
      } else {
        // No signal will ever arrive in poll-only mode; resolve the
        // transition here and let the poll establish ground truth.
        self.state.transitioning.set(false);
      }
    } else {
      tracing::warn!(action = action.name(), stderr = %stderr, "action failed");
      self.state.transitioning.set(false);
      self.arm_error();
    }

    self.spawn_poll();
  }

  fn arm_error(&mut self) {
    self.state.error.set(true);
    // A repeat failure restarts the single display window.
    self.error_deadline = Some(Instant::now() + self.config.error_display());
  }

  /// Reconciling poll, fired after every action completion.
  fn spawn_poll(&self) {
    let config = self.config.clone();
    let runner = self.runner.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      poller::poll_once(&config, runner.as_ref(), &tx).await;
    });
  }

  fn apply_status(&mut self, report: StatusReport) {
    // Container state is suppressed during a transition so a stale round
    // cannot race the machined signal; broker state is overwritten
    // wholesale every round.
    if let Some(running) = report.container
      && !self.state.transitioning.get()
    {
      self.state.container_running.set(running);
    }
    self.state.broker_running.set(report.broker);
  }
}

async fn error_expiry(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}
