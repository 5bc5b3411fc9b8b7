//! Observable machine state
//!
//! Four boolean flags, each backed by a `tokio::sync::watch` channel. All
//! writes go through [`ObservableFlag::set`], which is compare-and-notify:
//! subscribers are woken only when the value actually flips, never for a
//! write of the current value.

use tokio::sync::watch;

/// A single observable boolean with change notification.
pub struct ObservableFlag {
  tx: watch::Sender<bool>,
}

impl ObservableFlag {
  fn new(initial: bool) -> Self {
    Self {
      tx: watch::Sender::new(initial),
    }
  }

  /// Current value.
  pub fn get(&self) -> bool {
    *self.tx.borrow()
  }

  /// Subscribe to changes. The receiver yields on every flip and observes
  /// channel closure when the supervisor is torn down.
  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }

  /// Compare-and-notify write. Returns whether the value changed (and hence
  /// whether a notification fired).
  pub(crate) fn set(&self, value: bool) -> bool {
    self.tx.send_if_modified(|current| {
      if *current == value {
        false
      } else {
        *current = value;
        true
      }
    })
  }
}

/// The supervisor's observable surface.
///
/// Only the supervisor core task writes these flags; everything else reads or
/// subscribes.
pub struct MachineState {
  /// Best current knowledge of whether the machine is up.
  pub container_running: ObservableFlag,
  /// Broker-proxy activity, overwritten wholesale by every successful poll.
  pub broker_running: ObservableFlag,
  /// A user-initiated start or stop is in flight.
  pub transitioning: ObservableFlag,
  /// Transient failure indicator, self-clearing after the display window.
  pub error: ObservableFlag,
}

impl MachineState {
  pub fn new() -> Self {
    Self {
      container_running: ObservableFlag::new(false),
      broker_running: ObservableFlag::new(false),
      transitioning: ObservableFlag::new(false),
      error: ObservableFlag::new(false),
    }
  }
}

impl Default for MachineState {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flag_starts_at_initial_value() {
    let flag = ObservableFlag::new(false);
    assert!(!flag.get());
  }

  #[test]
  fn test_set_changes_value_and_reports_change() {
    let flag = ObservableFlag::new(false);
    assert!(flag.set(true));
    assert!(flag.get());
  }

  #[test]
  fn test_set_same_value_does_not_notify() {
    let flag = ObservableFlag::new(false);
    let mut rx = flag.subscribe();
    // Drain the initial state marker.
    rx.mark_unchanged();

    assert!(!flag.set(false));
    assert!(!rx.has_changed().unwrap(), "no notification for an unchanged value");
  }

  #[test]
  fn test_flip_notifies_exactly_once() {
    let flag = ObservableFlag::new(false);
    let mut rx = flag.subscribe();
    rx.mark_unchanged();

    assert!(flag.set(true));
    assert!(rx.has_changed().unwrap());
    rx.mark_unchanged();

    // Re-writing the same value after the flip stays silent.
    assert!(!flag.set(true));
    assert!(!rx.has_changed().unwrap());
  }

  #[test]
  fn test_broker_state_has_no_memory() {
    // Wholesale overwrite semantics: the flag tracks the latest write
    // exactly, flipping back and forth with each report.
    let state = MachineState::new();
    assert!(state.broker_running.set(true));
    assert!(state.broker_running.get());
    assert!(state.broker_running.set(false));
    assert!(!state.broker_running.get());
    assert!(state.broker_running.set(true));
    assert!(state.broker_running.get());
  }

  #[test]
  fn test_machine_state_starts_all_false() {
    let state = MachineState::new();
    assert!(!state.container_running.get());
    assert!(!state.broker_running.get());
    assert!(!state.transitioning.get());
    assert!(!state.error.get());
  }
}
