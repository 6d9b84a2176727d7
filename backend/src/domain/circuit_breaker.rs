//! Redis-backed circuit breaker shared by every server instance.
//!
//! State lives in two keys: `cb:<name>:failures` counts failures within the
//! failure window, and `cb:<name>:open` exists while the circuit is open.
//! When the open key expires the next call is attempted (half-open); a
//! success clears the counter, a failure counts toward reopening.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::ports::KeyValueStore;

/// Thresholds for a [`CircuitBreaker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u64,
    pub failure_window: Duration,
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            open_duration: Duration::from_secs(30),
        }
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError<E> {
    /// The circuit is open; the operation was not attempted.
    #[error("circuit `{name}` is open")]
    Open { name: String },
    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

/// Named breaker whose state lives in the key-value store, so every
/// server process shares it.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    store: Arc<dyn KeyValueStore>,
}

impl CircuitBreaker {
    /// Breaker named `name`; keys are `cb:<name>:open` and `cb:<name>:failures`.
    pub fn new(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            store,
        }
    }

    fn open_key(&self) -> String {
        format!("cb:{}:open", self.name)
    }

    fn failures_key(&self) -> String {
        format!("cb:{}:failures", self.name)
    }

    /// Whether the open key is present. Store errors read as closed.
    pub async fn is_open(&self) -> bool {
        match self.store.exists(&self.open_key()).await {
            Ok(open) => open,
            Err(err) => {
                warn!(breaker = %self.name, error = %err, "breaker state unavailable; treating as closed");
                false
            }
        }
    }

    /// Run `op` unless the circuit is open.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if self.is_open().await {
            return Err(CircuitError::Open {
                name: self.name.clone(),
            });
        }
        match op().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(CircuitError::Inner(err))
            }
        }
    }

    async fn record_success(&self) {
        if let Err(err) = self.store.delete(&[self.failures_key()]).await {
            warn!(breaker = %self.name, error = %err, "failed to reset breaker failures");
        }
    }

    async fn record_failure(&self) {
        let failures = match self
            .store
            .increment(&self.failures_key(), self.config.failure_window)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(breaker = %self.name, error = %err, "failed to count breaker failure");
                return;
            }
        };
        if failures < self.config.failure_threshold {
            return;
        }
        if let Err(err) = self
            .store
            .set(&self.open_key(), "1", self.config.open_duration)
            .await
        {
            warn!(breaker = %self.name, error = %err, "failed to open breaker");
            return;
        }
        if let Err(err) = self.store.delete(&[self.failures_key()]).await {
            warn!(breaker = %self.name, error = %err, "failed to reset breaker failures");
        }
        info!(breaker = %self.name, failures, "circuit opened");
    }
}
