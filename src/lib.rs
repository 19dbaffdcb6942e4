//! novatra-api process lifecycle.
//!
//! Brings up the service's network listeners, waits for a termination
//! request, and drains them within a bounded window.
//!
//! # Architecture Overview
//!
//! ```text
//!   ConfigSnapshot (config)
//!         │
//!         ▼
//!   bootstrap (lifecycle::startup)
//!         │   ServiceHandle "primary"  ─┐
//!         │   ServiceHandle "metrics"  ─┤ (service, http, net)
//!         ▼                             │
//!   LifecycleRegistry ◀─────────────────┘
//!         │
//!         ▼
//!   Orchestrator ── start_all ──▶ accept loops running
//!         │
//!         ▼
//!   SignalWatcher ── SIGINT / SIGTERM / context cancel / explicit stop
//!         │
//!         ▼
//!   ShutdownCoordinator ── stop_all under one deadline ──▶ ShutdownReport
//!         │
//!         ▼
//!   exit code (0 clean, 1 otherwise)
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod service;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ConfigSnapshot;
pub use lifecycle::{LifecycleRegistry, Orchestrator, ShutdownCoordinator, ShutdownReport};
pub use service::ServiceHandle;
