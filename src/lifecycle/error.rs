//! Lifecycle error taxonomy.
//!
//! Registration and startup failures are returned as [`LifecycleError`].
//! Shutdown failures are never returned; they are recorded per hook in the
//! [`ShutdownReport`](crate::lifecycle::shutdown::ShutdownReport).

use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

use crate::lifecycle::hook::HookError;
use crate::lifecycle::signals::TerminationSignal;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a hook named `{0}` is already registered")]
    DuplicateName(String),

    #[error("hook `{name}` failed to start: {source}")]
    Startup {
        name: String,
        #[source]
        source: HookError,
    },

    #[error("hook `{name}` did not start within the {budget:?} startup budget")]
    StartupTimeout { name: String, budget: Duration },

    #[error("received {0} while shutting down, exiting without waiting for drain")]
    ForcedExit(TerminationSignal),

    #[error("shutdown task failed: {0}")]
    ShutdownTask(#[from] JoinError),
}

impl LifecycleError {
    /// Name of the hook the error is about, if any.
    pub fn hook_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName(name)
            | Self::Startup { name, .. }
            | Self::StartupTimeout { name, .. } => Some(name),
            Self::ForcedExit(_) | Self::ShutdownTask(_) => None,
        }
    }
}
