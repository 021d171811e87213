use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed, install not yet attempted
    Parsed = 0,
    Installing = 1,
    /// Shell assets stored, waiting to activate
    Installed = 2,
    Activating = 3,
    /// Controlling pages and intercepting fetches
    Activated = 4,
    /// Install failed or the worker was replaced
    Redundant = 5,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Parsed,
            1 => WorkerState::Installing,
            2 => WorkerState::Installed,
            3 => WorkerState::Activating,
            4 => WorkerState::Activated,
            _ => WorkerState::Redundant,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle flags of a single worker instance.
#[derive(Debug)]
pub struct LifecycleStatus {
    state: AtomicU8,
    skip_waiting: AtomicBool,
}

impl LifecycleStatus {
    pub fn new(skip_waiting: bool) -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Parsed as u8),
            skip_waiting: AtomicBool::new(skip_waiting),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: WorkerState) {
        let prev = WorkerState::from_u8(self.state.swap(state as u8, Ordering::SeqCst));
        if prev != state {
            log::info!("Worker state {prev} -> {state}");
        }
    }

    /// Move from `from` to `to` only if the current state is `from`.
    pub fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        let swapped = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if swapped {
            log::info!("Worker state {from} -> {to}");
        }
        swapped
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
        log::debug!("Skip waiting requested");
    }
}
