//! Motion sequencer lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the motion sequencer
///
/// A run walks `Idle → Homing → Running → {Stopping, Completed, Faulted} → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SequencerState {
    /// No run active, ready to start
    #[default]
    Idle,
    /// Homing and lifting the pen before drawing
    Homing,
    /// Iterating the robot path or program
    Running,
    /// Cancellation observed, lifting the pen
    Stopping,
    /// Run finished, normally or stopped early
    Completed,
    /// Run aborted by a transport failure
    Faulted,
}

impl SequencerState {
    /// True while a run owns the transport
    pub fn is_active(&self) -> bool {
        !matches!(self, SequencerState::Idle)
    }

    /// True for states that end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequencerState::Completed | SequencerState::Faulted)
    }

    /// Check if a transition from this state to `target` is valid.
    ///
    /// - Idle only starts a run by homing
    /// - Homing and Running may stop, fault, or (Running only) complete
    /// - Stopping always ends in Completed, or Faulted if the pen-up write fails
    /// - Terminal states return to Idle
    /// - Any state may be forced into Stopping by an emergency stop
    pub fn can_transition_to(&self, target: SequencerState) -> bool {
        use SequencerState::*;
        if *self == target {
            return true;
        }
        match (self, target) {
            (_, Stopping) => true,
            (Idle, Homing) => true,
            (Homing, Running | Faulted) => true,
            (Running, Completed | Faulted) => true,
            (Stopping, Completed | Faulted | Idle) => true,
            (Completed | Faulted, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Homing => write!(f, "Homing"),
            Self::Running => write!(f, "Running"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Completed => write!(f, "Completed"),
            Self::Faulted => write!(f, "Faulted"),
        }
    }
}

/// Where a run sends its motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Drive the physical arm through the transport
    #[default]
    Device,
    /// Drive only the visualization events
    Simulation,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Device => write!(f, "device"),
            RunMode::Simulation => write!(f, "simulation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use SequencerState::*;
        assert!(Idle.can_transition_to(Homing));
        assert!(Homing.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Idle));
    }

    #[test]
    fn test_stop_and_fault_transitions() {
        use SequencerState::*;
        assert!(Running.can_transition_to(Stopping));
        assert!(Idle.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Completed));
        assert!(Running.can_transition_to(Faulted));
        assert!(Faulted.can_transition_to(Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        use SequencerState::*;
        assert!(!Idle.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Faulted.can_transition_to(Homing));
        assert!(!Homing.can_transition_to(Completed));
    }

    #[test]
    fn test_activity() {
        assert!(!SequencerState::Idle.is_active());
        assert!(SequencerState::Stopping.is_active());
        assert!(SequencerState::Faulted.is_terminal());
        assert_eq!(SequencerState::Stopping.to_string(), "Stopping");
    }
}
