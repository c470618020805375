use uuid::Uuid;

use super::TimelineState;

/// Owner of the one live `TimelineState` of an editing session.
///
/// Components borrow the session instead of reaching into shared globals.
/// The state is only ever swapped wholesale.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    state: TimelineState,
    /// Number of replacements since construction
    generation: u64,
}

impl Session {
    pub fn new(state: TimelineState) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            generation: 0,
        }
    }

    /// Identifies this side when writing to the shared store.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Swap in a new state, returning the one it replaced.
    pub fn replace(&mut self, next: TimelineState) -> TimelineState {
        self.generation += 1;
        std::mem::replace(&mut self.state, next)
    }

    /// Derive the next state from the current one and install it.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&TimelineState) -> TimelineState,
    {
        let next = f(&self.state);
        self.replace(next);
    }
}
