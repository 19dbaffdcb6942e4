//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (resolve, bind, fail fast)
//!     → Hand off to a ServiceHandle accept loop
//!     → connection.rs (in-flight request accounting for drain)
//! ```

pub mod connection;
pub mod listener;

pub use connection::{InFlightTracker, RequestGuard};
pub use listener::{bind, ListenerError};
