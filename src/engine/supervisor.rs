//! Engine Supervisor
//!
//! `Bootstrapping -> Running -> Faulted -> (backoff) -> Bootstrapping`.
//! Only a failure of the very first login is terminal; restarts after that
//! repeat indefinitely with a fixed backoff.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Logging in, timers disarmed
    Bootstrapping,
    /// Both timers armed
    Running,
    /// Timers torn down, waiting out the restart backoff
    Faulted,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    LoginSucceeded,
    LoginFailed,
    TickFailed,
    BackoffElapsed,
    ShutdownRequested,
}

#[derive(Debug)]
pub struct Supervisor {
    state: EngineState,
    bootstrapped: bool,
    restarts: u64,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            state: EngineState::Bootstrapping,
            bootstrapped: false,
            restarts: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Restart attempts begun so far
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Whether an initial login has ever succeeded
    pub fn has_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Apply an event and return the new state
    pub fn handle(&mut self, event: EngineEvent) -> EngineState {
        use EngineEvent::*;
        use EngineState::*;

        let next = match (self.state, event) {
            (_, ShutdownRequested) => Stopped,
            (Stopped, _) => Stopped,
            (Bootstrapping, LoginSucceeded) => {
                self.bootstrapped = true;
                Running
            }
            (Bootstrapping, LoginFailed) if !self.bootstrapped => Stopped,
            (Bootstrapping, LoginFailed) => Faulted,
            (Running, TickFailed) => Faulted,
            (Faulted, BackoffElapsed) => {
                self.restarts += 1;
                Bootstrapping
            }
            (state, event) => {
                warn!(state = ?state, event = ?event, "Ignoring event not valid in current state");
                state
            }
        };

        if next != self.state {
            info!(from = ?self.state, to = ?next, restarts = self.restarts, "Engine state transition");
        }

        self.state = next;
        next
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
