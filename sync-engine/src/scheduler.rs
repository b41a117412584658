//! Debounce and flush-trigger state machine.
//!
//! Pure and clock-free: the engine owns the actual timer and feeds events in,
//! executing whatever [`SchedulerAction`] comes back. Timers are identified by
//! a generation number so a cancelled timer that still fires is ignored.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Debouncing,
    Flushing,
}

/// External events that demand an immediate flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushSignal {
    Blur,
    KeyboardDismissed,
    Done,
    NavigateAway,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    Debounce,
    Signal(FlushSignal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    None,
    /// Start the debounce timer, replacing any armed one.
    ArmTimer { generation: u64 },
    /// Run a flush now. Any armed timer is void.
    Flush,
}

#[derive(Debug)]
pub struct SaveScheduler {
    state: SchedulerState,
    generation: u64,
    edited_during_flush: bool,
}

impl SaveScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            generation: 0,
            edited_during_flush: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_flushing(&self) -> bool {
        self.state == SchedulerState::Flushing
    }

    /// Generation of the most recently armed timer.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on_edit(&mut self) -> SchedulerAction {
        match self.state {
            SchedulerState::Flushing => {
                self.edited_during_flush = true;
                SchedulerAction::None
            }
            SchedulerState::Idle | SchedulerState::Debouncing => self.arm(),
        }
    }

    pub fn on_timer(&mut self, generation: u64) -> SchedulerAction {
        if self.state != SchedulerState::Debouncing || generation != self.generation {
            debug!(generation, current = self.generation, "ignoring stale debounce timer");
            return SchedulerAction::None;
        }
        self.begin_flush()
    }

    /// Forced flush. A no-op while a request is already in flight.
    pub fn on_signal(&mut self, signal: FlushSignal) -> SchedulerAction {
        if self.state == SchedulerState::Flushing {
            debug!(?signal, "flush already in flight, signal coalesced");
            return SchedulerAction::None;
        }
        self.begin_flush()
    }

    /// The in-flight request finished, successfully or not.
    pub fn on_flush_complete(&mut self) -> SchedulerAction {
        if self.state != SchedulerState::Flushing {
            return SchedulerAction::None;
        }
        if std::mem::take(&mut self.edited_during_flush) {
            return self.arm();
        }
        self.state = SchedulerState::Idle;
        SchedulerAction::None
    }

    /// Drops a pending debounce. An in-flight flush is left to finish.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.edited_during_flush = false;
        if self.state == SchedulerState::Debouncing {
            self.state = SchedulerState::Idle;
        }
    }

    fn arm(&mut self) -> SchedulerAction {
        self.generation += 1;
        self.state = SchedulerState::Debouncing;
        SchedulerAction::ArmTimer { generation: self.generation }
    }

    fn begin_flush(&mut self) -> SchedulerAction {
        self.generation += 1;
        self.edited_during_flush = false;
        self.state = SchedulerState::Flushing;
        SchedulerAction::Flush
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}
