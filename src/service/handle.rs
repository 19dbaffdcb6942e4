//! A named network listener with its own start/stop lifecycle.

use async_trait::async_trait;
use axum::Router;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectionTimeouts;
use crate::http::{serve, with_connection_layers};
use crate::lifecycle::hook::{HookContext, HookError, LifecycleHook};
use crate::net::{listener, InFlightTracker};
use crate::service::state::ServiceState;

/// What a bind failure at startup means for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPolicy {
    /// Bind failure aborts startup.
    Required,
    /// Bind failure is logged; the service stays closed and startup continues.
    Optional,
}

/// Per-listener settings derived from the config snapshot.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub bind_address: String,
    pub timeouts: ConnectionTimeouts,
    /// Upper bound for draining in-flight requests on stop.
    pub drain_timeout: Duration,
    pub policy: StartPolicy,
}

impl ServiceSettings {
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            timeouts: ConnectionTimeouts::default(),
            drain_timeout: Duration::from_secs(30),
            policy: StartPolicy::Required,
        }
    }

    pub fn with_timeouts(mut self, timeouts: ConnectionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn with_policy(mut self, policy: StartPolicy) -> Self {
        self.policy = policy;
        self
    }
}

struct Inner {
    state: ServiceState,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<io::Result<()>>>,
    /// Set by the accept task when it ends without being asked to.
    failure: Option<String>,
}

impl Inner {
    fn transition(&mut self, name: &str, next: ServiceState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(service = %name, from = %self.state, to = %next, "Service state changed");
        self.state = next;
    }
}

/// A listener owned by the lifecycle registry.
///
/// Starting binds the socket and spawns the accept loop. Stopping stops
/// accepting, drains in-flight requests, and aborts whatever is still open
/// when the drain bound elapses.
pub struct ServiceHandle {
    name: String,
    settings: ServiceSettings,
    handler: Router,
    tracker: InFlightTracker,
    /// Cancelled when this listener should stop accepting.
    shutdown: CancellationToken,
    /// Cancelled when the drain bound elapses; open connections are aborted.
    force: CancellationToken,
    /// Process context, cancelled if the accept loop dies on its own.
    process: CancellationToken,
    inner: Arc<Mutex<Inner>>,
}

impl ServiceHandle {
    pub fn new(
        name: impl Into<String>,
        settings: ServiceSettings,
        handler: Router,
        process: CancellationToken,
    ) -> Self {
        let name = name.into();
        Self {
            tracker: InFlightTracker::new(&name),
            name,
            settings,
            handler,
            shutdown: CancellationToken::new(),
            force: CancellationToken::new(),
            process,
            inner: Arc::new(Mutex::new(Inner {
                state: ServiceState::Unstarted,
                local_addr: None,
                task: None,
                failure: None,
            })),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.lock().state
    }

    /// Address actually bound, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().local_addr
    }

    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_accept_loop(&self, listener: tokio::net::TcpListener) -> JoinHandle<io::Result<()>> {
        let app = with_connection_layers(
            self.handler.clone(),
            self.settings.timeouts,
            self.tracker.clone(),
        );
        let name = self.name.clone();
        let shutdown = self.shutdown.clone();
        let force = self.force.clone();

        self.supervise(async move { serve(&name, listener, app, shutdown, force).await })
    }

    /// Run `accept_loop` in its own task and watch it.
    ///
    /// Any exit that was not requested through the shutdown token, including
    /// a panic, closes the handle, records the failure and cancels the
    /// process context.
    fn supervise<F>(&self, accept_loop: F) -> JoinHandle<io::Result<()>>
    where
        F: Future<Output = io::Result<()>> + Send + 'static,
    {
        let accept_loop = tokio::spawn(accept_loop);
        let shutdown = self.shutdown.clone();
        let process = self.process.clone();
        let inner = Arc::clone(&self.inner);
        let name = self.name.clone();

        tokio::spawn(async move {
            let result = match accept_loop.await {
                Ok(result) => result,
                Err(e) => Err(io::Error::other(format!("accept loop panicked: {e}"))),
            };

            if !shutdown.is_cancelled() {
                let reason = match &result {
                    Ok(()) => "accept loop stopped without a shutdown request".to_string(),
                    Err(e) => format!("accept loop failed: {e}"),
                };
                tracing::error!(service = %name, reason = %reason, "Listener exited unexpectedly");
                {
                    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                    if inner.state == ServiceState::Listening {
                        inner.transition(&name, ServiceState::Closed);
                        inner.failure = Some(reason);
                    }
                }
                process.cancel();
            }

            result
        })
    }
}

#[async_trait]
impl LifecycleHook for ServiceHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_start(&self, _ctx: &HookContext) -> Result<(), HookError> {
        if self.state() != ServiceState::Unstarted {
            return Ok(());
        }

        let listener = match listener::bind(&self.settings.bind_address).await {
            Ok(listener) => listener,
            Err(e) if self.settings.policy == StartPolicy::Optional => {
                tracing::warn!(
                    service = %self.name,
                    error = %e,
                    "Optional listener failed to bind, continuing without it"
                );
                self.lock().transition(&self.name, ServiceState::Closed);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let local_addr = listener.local_addr().map_err(HookError::Serve)?;

        {
            let mut inner = self.lock();
            inner.local_addr = Some(local_addr);
            inner.transition(&self.name, ServiceState::Listening);
        }
        let task = self.spawn_accept_loop(listener);
        self.lock().task = Some(task);

        tracing::info!(service = %self.name, address = %local_addr, "Service listening");
        Ok(())
    }

    async fn on_stop(&self, ctx: &HookContext) -> Result<(), HookError> {
        let task = {
            let mut inner = self.lock();
            match inner.state {
                ServiceState::Unstarted => {
                    inner.transition(&self.name, ServiceState::Closed);
                    return Ok(());
                }
                ServiceState::Closed => {
                    inner.task.take();
                    return match inner.failure.take() {
                        Some(reason) => Err(HookError::Failed(reason)),
                        None => Ok(()),
                    };
                }
                ServiceState::Draining => return Ok(()),
                ServiceState::Listening => {
                    inner.transition(&self.name, ServiceState::Draining);
                    inner.task.take()
                }
            }
        };

        let drain_deadline = ctx
            .deadline()
            .min(Instant::now() + self.settings.drain_timeout);
        let budget = drain_deadline.saturating_duration_since(Instant::now());

        tracing::info!(
            service = %self.name,
            in_flight = self.in_flight(),
            budget_ms = budget.as_millis() as u64,
            "Draining service"
        );
        self.shutdown.cancel();
        // Abandon open connections if this stop is itself cut short.
        let _abandon = self.force.clone().drop_guard();

        let Some(mut task) = task else {
            self.lock().transition(&self.name, ServiceState::Closed);
            return Ok(());
        };

        let joined = tokio::select! {
            joined = &mut task => Some(joined),
            _ = tokio::time::sleep_until(drain_deadline) => None,
        };

        let result = match joined {
            Some(Ok(Ok(()))) => Ok(()),
            Some(Ok(Err(e))) => Err(HookError::Serve(e)),
            Some(Err(e)) => Err(HookError::Join(e)),
            None => {
                let in_flight = self.in_flight();
                self.force.cancel();
                // The accept task aborts its connections and returns promptly.
                let _ = task.await;
                Err(HookError::DrainTimeout {
                    timeout: budget,
                    in_flight,
                })
            }
        };

        self.lock().transition(&self.name, ServiceState::Closed);

        match &result {
            Ok(()) => tracing::info!(service = %self.name, "Service closed"),
            Err(e) => tracing::warn!(service = %self.name, error = %e, "Service closed uncleanly"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::signals::{ShutdownTrigger, SignalWatcher};
    use axum::routing::get;
    use tokio::sync::mpsc;

    fn handle(name: &str, address: &str, policy: StartPolicy) -> ServiceHandle {
        ServiceHandle::new(
            name,
            ServiceSettings::new(address).with_policy(policy),
            Router::new().route("/", get(|| async { "ok" })),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn start_then_stop_walks_the_state_machine() {
        let service = handle("primary", "127.0.0.1:0", StartPolicy::Required);
        let ctx = HookContext::with_timeout(Duration::from_secs(5));
        assert_eq!(service.state(), ServiceState::Unstarted);

        service.on_start(&ctx).await.unwrap();
        assert_eq!(service.state(), ServiceState::Listening);
        assert!(service.local_addr().is_some());

        service.on_stop(&ctx).await.unwrap();
        assert_eq!(service.state(), ServiceState::Closed);
    }

    #[tokio::test]
    async fn stop_before_start_closes() {
        let service = handle("primary", "127.0.0.1:0", StartPolicy::Required);
        let ctx = HookContext::with_timeout(Duration::from_secs(1));

        service.on_stop(&ctx).await.unwrap();
        assert_eq!(service.state(), ServiceState::Closed);

        // Closed is terminal; starting again does nothing.
        service.on_start(&ctx).await.unwrap();
        assert_eq!(service.state(), ServiceState::Closed);
        assert!(service.local_addr().is_none());
    }

    #[tokio::test]
    async fn required_bind_failure_is_an_error() {
        let service = handle("primary", "not-a-host-name:abc", StartPolicy::Required);
        let ctx = HookContext::with_timeout(Duration::from_secs(1));

        let err = service.on_start(&ctx).await.unwrap_err();
        assert!(matches!(err, HookError::Listener(_)));
        assert_eq!(service.state(), ServiceState::Unstarted);
    }

    #[tokio::test]
    async fn optional_bind_failure_degrades() {
        let service = handle("metrics", "not-a-host-name:abc", StartPolicy::Optional);
        let ctx = HookContext::with_timeout(Duration::from_secs(1));

        service.on_start(&ctx).await.unwrap();
        assert_eq!(service.state(), ServiceState::Closed);
        service.on_stop(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn second_stop_is_a_no_op() {
        let service = handle("primary", "127.0.0.1:0", StartPolicy::Required);
        let ctx = HookContext::with_timeout(Duration::from_secs(5));

        service.on_start(&ctx).await.unwrap();
        service.on_stop(&ctx).await.unwrap();
        service.on_stop(&ctx).await.unwrap();
        assert_eq!(service.state(), ServiceState::Closed);
    }

    /// A handle marked as listening whose accept task is `accept_loop`.
    fn listening_with<F>(accept_loop: F, process: CancellationToken) -> ServiceHandle
    where
        F: Future<Output = io::Result<()>> + Send + 'static,
    {
        let service = ServiceHandle::new(
            "primary",
            ServiceSettings::new("127.0.0.1:0"),
            Router::new(),
            process,
        );
        service.lock().transition("primary", ServiceState::Listening);
        let task = service.supervise(accept_loop);
        service.lock().task = Some(task);
        service
    }

    async fn exploding_accept_loop() -> io::Result<()> {
        panic!("accept loop exploded")
    }

    #[tokio::test]
    async fn accept_loop_panic_cancels_process_context() {
        let context = CancellationToken::new();
        let (_tx, rx) = mpsc::channel(1);
        let watcher = SignalWatcher::new(rx, context.clone());

        let service = listening_with(exploding_accept_loop(), context.clone());

        let (trigger, _) = tokio::time::timeout(Duration::from_secs(1), watcher.wait())
            .await
            .unwrap();
        assert_eq!(trigger, ShutdownTrigger::ContextCancelled);
        assert!(context.is_cancelled());
        assert_eq!(service.state(), ServiceState::Closed);

        let err = service
            .on_stop(&HookContext::with_timeout(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Failed(ref reason) if reason.contains("panicked")));
    }

    #[tokio::test]
    async fn unrequested_accept_loop_exit_is_reported_on_stop() {
        let context = CancellationToken::new();
        let service = listening_with(async { Ok::<(), io::Error>(()) }, context.clone());

        tokio::time::timeout(Duration::from_secs(1), context.cancelled())
            .await
            .unwrap();
        assert_eq!(service.state(), ServiceState::Closed);

        let ctx = HookContext::with_timeout(Duration::from_secs(1));
        let err = service.on_stop(&ctx).await.unwrap_err();
        assert!(matches!(err, HookError::Failed(ref reason) if reason.contains("without a shutdown request")));

        // The failure is reported once.
        service.on_stop(&ctx).await.unwrap();
    }
}
