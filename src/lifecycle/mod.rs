//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Wiring (startup.rs):
//!     ConfigSnapshot → ServiceHandles → LifecycleRegistry (registry.rs)
//!
//! Run (orchestrator.rs):
//!     start_all in registration order, bounded by the startup budget
//!     → SignalWatcher (signals.rs) resolves one ShutdownTrigger
//!     → ShutdownCoordinator (shutdown.rs) runs stop_all under one deadline
//!     → ShutdownReport → exit code
//! ```
//!
//! # Design Decisions
//! - Ordered startup: a failure in hook N means hooks 1..N-1 are running
//! - Concurrent shutdown: listeners drain in parallel, bounded by one deadline
//! - Shutdown has timeout: forced closes are reported, never silent
//! - A second SIGTERM/SIGINT during shutdown forces exit

pub mod error;
pub mod hook;
pub mod orchestrator;
pub mod registry;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use error::LifecycleError;
pub use hook::{HookContext, HookError, LifecycleHook};
pub use orchestrator::Orchestrator;
pub use registry::LifecycleRegistry;
pub use shutdown::{HookOutcome, HookReport, ShutdownCoordinator, ShutdownReport};
pub use signals::{ForceExit, ShutdownTrigger, SignalWatcher, StopHandle, TerminationSignal};
pub use startup::{bootstrap, Services};
