//! Shutdown trigger detection.
//!
//! # Responsibilities
//! - Register SIGTERM/SIGINT handlers and forward them as internal events
//! - Resolve exactly one [`ShutdownTrigger`] from signals, the process
//!   context, or an explicit stop request
//! - Hand back the signal stream so a second signal can force exit
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals arrive over a channel, so tests feed simulated ones
//! - `wait` consumes the watcher: one trigger per process run

use std::fmt;
use std::io;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The OS termination requests the process reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// The event that started the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    OsSignal(TerminationSignal),
    /// The process context was cancelled, e.g. a listener died.
    ContextCancelled,
    ExplicitStop,
    /// Startup failed and the partially started services are rolled back.
    StartupFailed,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::OsSignal(signal) => write!(f, "signal {signal}"),
            ShutdownTrigger::ContextCancelled => f.write_str("context cancelled"),
            ShutdownTrigger::ExplicitStop => f.write_str("explicit stop"),
            ShutdownTrigger::StartupFailed => f.write_str("startup failure"),
        }
    }
}

/// Requests shutdown from inside the process.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        tracing::info!("Explicit stop requested");
        self.token.cancel();
    }
}

/// Waits for the single event that starts shutdown.
pub struct SignalWatcher {
    signals: mpsc::Receiver<TerminationSignal>,
    context: CancellationToken,
    stop: CancellationToken,
}

impl SignalWatcher {
    /// Watch `signals` and the process `context`.
    pub fn new(signals: mpsc::Receiver<TerminationSignal>, context: CancellationToken) -> Self {
        Self {
            signals,
            context,
            stop: CancellationToken::new(),
        }
    }

    /// Watch the real OS termination signals.
    pub fn install(context: CancellationToken) -> io::Result<Self> {
        Ok(Self::new(os_signals()?, context))
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.stop.clone(),
        }
    }

    /// Block until a trigger fires.
    ///
    /// When several sources are ready at once the first in this order wins:
    /// OS signal, context cancellation, explicit stop. The others are
    /// discarded. The returned [`ForceExit`] yields any later signal.
    pub async fn wait(mut self) -> (ShutdownTrigger, ForceExit) {
        let trigger = tokio::select! {
            biased;
            Some(signal) = self.signals.recv() => ShutdownTrigger::OsSignal(signal),
            _ = self.context.cancelled() => ShutdownTrigger::ContextCancelled,
            _ = self.stop.cancelled() => ShutdownTrigger::ExplicitStop,
        };

        tracing::info!(trigger = %trigger, "Shutdown triggered");
        (
            trigger,
            ForceExit {
                signals: self.signals,
            },
        )
    }
}

/// The signal stream left over after the trigger fired.
pub struct ForceExit {
    signals: mpsc::Receiver<TerminationSignal>,
}

impl ForceExit {
    /// Resolves on the next termination signal. Pending forever if the
    /// signal source is gone.
    pub async fn next(&mut self) -> TerminationSignal {
        match self.signals.recv().await {
            Some(signal) => signal,
            None => std::future::pending().await,
        }
    }
}

/// Forward SIGINT and SIGTERM into a channel.
#[cfg(unix)]
pub fn os_signals() -> io::Result<mpsc::Receiver<TerminationSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        loop {
            let signal = tokio::select! {
                Some(()) = interrupt.recv() => TerminationSignal::Interrupt,
                Some(()) = terminate.recv() => TerminationSignal::Terminate,
                else => break,
            };
            tracing::info!(signal = %signal, "Received termination signal");
            if tx.send(signal).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

/// Forward Ctrl+C into a channel.
#[cfg(not(unix))]
pub fn os_signals() -> io::Result<mpsc::Receiver<TerminationSignal>> {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C");
            if tx.send(TerminationSignal::Interrupt).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}
