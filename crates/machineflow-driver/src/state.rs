//! Driver-observable machine states

use serde::{Deserialize, Serialize};

/// State of a machine as reported to the host
///
/// Drivers map whatever their provider reports onto this vocabulary and never
/// enforce transition legality themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    /// Unknown or unmapped status
    #[default]
    None,
    /// Machine is running
    Running,
    /// Machine is paused
    Paused,
    /// Machine state has been saved (suspended)
    Saved,
    /// Machine is stopped
    Stopped,
    /// Machine is being stopped
    Stopping,
    /// Machine is being created or booted
    Starting,
    /// Machine is in error state
    Error,
    /// Machine did not answer
    Timeout,
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineState::None => write!(f, ""),
            MachineState::Running => write!(f, "Running"),
            MachineState::Paused => write!(f, "Paused"),
            MachineState::Saved => write!(f, "Saved"),
            MachineState::Stopped => write!(f, "Stopped"),
            MachineState::Stopping => write!(f, "Stopping"),
            MachineState::Starting => write!(f, "Starting"),
            MachineState::Error => write!(f, "Error"),
            MachineState::Timeout => write!(f, "Timeout"),
        }
    }
}
