//! machdock — lifecycle supervisor for a single systemd-nspawn machine
//!
//! Tracks one named machine through two independent, asynchronous sources of
//! truth — machined `MachineNew`/`MachineRemoved` signals on the system bus
//! and a polled `<tool> status` command — and exposes four observable boolean
//! flags (container running, broker-proxy running, transitioning, transient
//! error) plus start/stop/shell actions to a presentation layer.

pub mod command;
pub mod config;
pub mod manager;
pub mod state;
pub mod status;
pub mod terminal;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use config::{Config, StartStrategy};
pub use manager::MachineManager;
pub use state::{MachineState, ObservableFlag};
pub use status::StatusReport;
