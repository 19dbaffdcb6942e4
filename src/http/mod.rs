//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (accepted by a ServiceHandle)
//!     → server.rs connection layers (request ID, tracing, timeouts,
//!       in-flight accounting)
//!     → primary router or metrics router
//! ```

pub mod server;

pub use server::{metrics_router, primary_router, serve, with_connection_layers, ServiceInfo};
