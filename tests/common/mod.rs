//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use novatra_api::config::ConfigSnapshot;
use novatra_api::lifecycle::{HookContext, HookError, LifecycleHook};

/// How a mock hook behaves when started.
#[derive(Debug, Clone, Copy)]
pub enum OnStart {
    Succeed,
    Fail(&'static str),
    Hang,
}

/// How a mock hook behaves when stopped.
#[derive(Debug, Clone, Copy)]
pub enum OnStop {
    SucceedAfter(Duration),
    Fail(&'static str),
    Hang,
    Panic,
}

/// Ordered record of hook calls shared between mocks.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A programmable lifecycle hook that counts its calls.
pub struct MockHook {
    name: String,
    on_start: OnStart,
    on_stop: OnStop,
    starts: AtomicUsize,
    stops: AtomicUsize,
    log: CallLog,
}

impl MockHook {
    pub fn new(name: &str, on_start: OnStart, on_stop: OnStop, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            on_start,
            on_stop,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            log: Arc::clone(log),
        })
    }

    /// Starts fine, stops after `delay`.
    pub fn healthy(name: &str, delay: Duration, log: &CallLog) -> Arc<Self> {
        Self::new(name, OnStart::Succeed, OnStop::SucceedAfter(delay), log)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn record(&self, event: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", event, self.name));
    }
}

#[async_trait]
impl LifecycleHook for MockHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_start(&self, _ctx: &HookContext) -> Result<(), HookError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.record("start");
        match self.on_start {
            OnStart::Succeed => Ok(()),
            OnStart::Fail(reason) => Err(HookError::failed(reason)),
            OnStart::Hang => std::future::pending().await,
        }
    }

    async fn on_stop(&self, _ctx: &HookContext) -> Result<(), HookError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.record("stop");
        match self.on_stop {
            OnStop::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            OnStop::Fail(reason) => Err(HookError::failed(reason)),
            OnStop::Hang => std::future::pending().await,
            OnStop::Panic => panic!("stop hook exploded"),
        }
    }
}

/// Config with both listeners on ephemeral loopback ports.
pub fn loopback_config() -> ConfigSnapshot {
    let mut config = ConfigSnapshot::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.server.metrics_port = 0;
    config.lifecycle.shutdown_grace_secs = 5;
    config.lifecycle.startup_timeout_secs = 5;
    config
}

/// HTTP client that never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
