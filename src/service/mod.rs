//! Network services managed by the lifecycle.
//!
//! # Data Flow
//! ```text
//! ConfigSnapshot
//!     → ServiceSettings (address, timeouts, drain bound, start policy)
//!     → ServiceHandle (named listener, implements LifecycleHook)
//!     → registered in the LifecycleRegistry
//! ```
//!
//! # Design Decisions
//! - Each handle owns its accept task; nothing runs unobserved
//! - A listener that dies on its own cancels the process context
//! - Draining is bounded; a forced close is reported, never hidden

pub mod handle;
pub mod state;

pub use handle::{ServiceHandle, ServiceSettings, StartPolicy};
pub use state::ServiceState;
