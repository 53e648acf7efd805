use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending { value: String, deadline: Instant },
    Committed(String),
}

/// Debounced value as an explicit state machine. Every input restarts the
/// quiet period; a value is committed only once it has been left alone for
/// the whole interval.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: DebounceState::Idle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn input(&mut self, value: impl Into<String>, now: Instant) {
        self.state = DebounceState::Pending {
            value: value.into(),
            deadline: now + self.interval,
        };
    }

    /// Commits a pending value whose deadline has passed and returns it.
    /// Returns `None` when nothing changed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.state {
            DebounceState::Pending { value, deadline } if now >= *deadline => {
                let value = value.clone();
                self.state = DebounceState::Committed(value.clone());
                Some(value)
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            DebounceState::Pending { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    pub fn committed(&self) -> Option<&str> {
        match &self.state {
            DebounceState::Committed(v) => Some(v),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = DebounceState::Idle;
    }
}
