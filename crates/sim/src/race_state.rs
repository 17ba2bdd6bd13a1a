use skyrace_shared::{RaceError, RaceState};
use tracing::info;

/// Race-time accounting across pauses. Timestamps are simulation seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RaceClock {
    elapsed_before_pause: f64,
    last_resume: f64,
}

impl RaceClock {
    /// Elapsed race time as seen in `state`. Only advances while playing.
    pub fn race_time(&self, state: RaceState, now: f64) -> f64 {
        match state {
            RaceState::Playing => self.elapsed_before_pause + (now - self.last_resume),
            RaceState::Paused | RaceState::Finished => self.elapsed_before_pause,
            RaceState::Idle | RaceState::Countdown => 0.0,
        }
    }

    fn resume(&mut self, now: f64) {
        self.last_resume = now;
    }

    fn suspend(&mut self, now: f64) {
        self.elapsed_before_pause += now - self.last_resume;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub from: RaceState,
    pub to: RaceState,
    /// Race time right after the transition took effect.
    pub race_time: f64,
}

pub type StateObserver = Box<dyn FnMut(&StateChange) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(usize);

/// Race lifecycle, clock and change observers, passed explicitly to whoever
/// needs them.
pub struct RaceContext {
    state: RaceState,
    clock: RaceClock,
    observers: Vec<(ObserverHandle, StateObserver)>,
    next_handle: usize,
}

impl std::fmt::Debug for RaceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceContext")
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for RaceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceContext {
    pub fn new() -> Self {
        Self {
            state: RaceState::Idle,
            clock: RaceClock::default(),
            observers: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == RaceState::Playing
    }

    pub fn race_time(&self, now: f64) -> f64 {
        self.clock.race_time(self.state, now)
    }

    /// Register a callback run synchronously on every state change, after
    /// the state and clock are updated. Callbacks run in registration order.
    pub fn subscribe(&mut self, observer: StateObserver) -> ObserverHandle {
        let handle = ObserverHandle(self.next_handle);
        self.next_handle += 1;
        self.observers.push((handle, observer));
        handle
    }

    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(h, _)| *h != handle);
        self.observers.len() != before
    }

    /// Move to `to`, applying the clock effect of entering it exactly once.
    pub fn transition(&mut self, to: RaceState, now: f64) -> Result<StateChange, RaceError> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(RaceError::IllegalTransition { from, to });
        }
        self.state = to;

        match to {
            RaceState::Playing => self.clock.resume(now),
            RaceState::Paused => self.clock.suspend(now),
            // Finishing from a pause has already banked the elapsed time.
            RaceState::Finished if from == RaceState::Playing => self.clock.suspend(now),
            RaceState::Idle => self.clock.reset(),
            _ => {}
        }

        let change = StateChange {
            from,
            to,
            race_time: self.race_time(now),
        };
        info!(?from, ?to, race_time = change.race_time, "race state changed");
        for (_, observer) in self.observers.iter_mut() {
            observer(&change);
        }
        Ok(change)
    }
}
