//! Service listener state machine.
//!
//! # States
//! - Unstarted: constructed, no socket yet
//! - Listening: socket bound, accept loop running
//! - Draining: no new connections, in-flight requests finishing
//! - Closed: terminal
//!
//! # State Transitions
//! ```text
//! Unstarted → Listening: start succeeded
//! Unstarted → Closed:    stop before start, or optional listener failed to bind
//! Listening → Draining:  stop requested
//! Listening → Closed:    accept loop exited on its own
//! Draining  → Closed:    drain finished or its deadline elapsed
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Unstarted,
    Listening,
    Draining,
    Closed,
}

impl ServiceState {
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::{Closed, Draining, Listening, Unstarted};
        matches!(
            (self, next),
            (Unstarted, Listening)
                | (Unstarted, Closed)
                | (Listening, Draining)
                | (Listening, Closed)
                | (Draining, Closed)
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Unstarted => "unstarted",
            ServiceState::Listening => "listening",
            ServiceState::Draining => "draining",
            ServiceState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceState::*;

    #[test]
    fn closed_is_terminal() {
        for next in [Unstarted, Listening, Draining, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn no_way_back_to_listening() {
        assert!(!Draining.can_transition_to(Listening));
        assert!(!Closed.can_transition_to(Listening));
        assert!(Unstarted.can_transition_to(Listening));
    }
}
