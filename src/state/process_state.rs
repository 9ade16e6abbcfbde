/// Pipeline lifecycle state machine
///
/// Stopped -> Starting -> Running -> Stopping -> Stopped. The transitional
/// states cover thread spawning and draining; any request arriving while
/// in one of them is rejected.
use crate::error::PipelineError;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ProcessState {
    #[default]
    Stopped,

    /// Threads are being spawned
    Starting,

    Running { since: Instant },

    /// Capture has been told to stop; recognition and consumer are draining
    Stopping,
}

impl ProcessState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, ProcessState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running { .. })
    }

    /// Time since the pipeline started (if running)
    pub fn running_duration(&self) -> Option<Duration> {
        match self {
            ProcessState::Running { since } => Some(since.elapsed()),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProcessStateMachine {
    state: ProcessState,
}

impl ProcessStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Stopped -> Starting
    pub fn start(&mut self) -> Result<(), PipelineError> {
        match self.state {
            ProcessState::Stopped => {
                self.state = ProcessState::Starting;
                Ok(())
            }
            ProcessState::Running { .. } => Err(PipelineError::AlreadyRunning),
            _ => Err(PipelineError::InTransition),
        }
    }

    /// Starting -> Running
    pub fn mark_running(&mut self) -> Result<(), PipelineError> {
        match self.state {
            ProcessState::Starting => {
                self.state = ProcessState::Running {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(PipelineError::InTransition),
        }
    }

    /// Running -> Stopping
    pub fn stop(&mut self) -> Result<(), PipelineError> {
        match self.state {
            ProcessState::Running { .. } => {
                self.state = ProcessState::Stopping;
                Ok(())
            }
            ProcessState::Stopped => Err(PipelineError::NotRunning),
            _ => Err(PipelineError::InTransition),
        }
    }

    /// Stopping -> Stopped
    pub fn mark_stopped(&mut self) -> Result<(), PipelineError> {
        match self.state {
            ProcessState::Stopping => {
                self.state = ProcessState::Stopped;
                Ok(())
            }
            _ => Err(PipelineError::InTransition),
        }
    }

    /// Back to Stopped from anywhere (failed start)
    pub fn force_stop(&mut self) {
        self.state = ProcessState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_state_predicates() {
        let stopped = ProcessState::Stopped;
        assert!(stopped.is_stopped());
        assert!(!stopped.is_running());
        assert!(stopped.running_duration().is_none());

        let running = ProcessState::Running {
            since: Instant::now(),
        };
        assert!(running.is_running());
        assert!(!running.is_stopped());
        assert!(running.running_duration().is_some());

        assert!(!ProcessState::Stopping.is_running());
        assert!(ProcessState::Stopping.running_duration().is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut sm = ProcessStateMachine::new();
        assert_eq!(sm.state(), ProcessState::Stopped);

        sm.start().unwrap();
        assert!(matches!(sm.start(), Err(PipelineError::InTransition)));

        sm.mark_running().unwrap();
        assert!(matches!(sm.start(), Err(PipelineError::AlreadyRunning)));

        sm.stop().unwrap();
        assert!(matches!(sm.stop(), Err(PipelineError::InTransition)));

        sm.mark_stopped().unwrap();
        assert!(sm.state().is_stopped());
    }

    #[test]
    fn test_stop_when_idle() {
        let mut sm = ProcessStateMachine::new();
        assert!(matches!(sm.stop(), Err(PipelineError::NotRunning)));
        assert!(matches!(sm.mark_stopped(), Err(PipelineError::InTransition)));
    }

    #[test]
    fn test_force_stop() {
        let mut sm = ProcessStateMachine::new();
        sm.start().unwrap();
        sm.force_stop();
        assert_eq!(sm.state(), ProcessState::Stopped);
    }
}
