//! Instrumentation interceptor: the single chokepoint for every operation.
//!
//! Each execution is timed, logged on the `es` target (debug normally, warn
//! when slower than the configured threshold, error on failure), counted in
//! metrics, and has its failure normalized into an [`EsError`] carrying the
//! operation context. The call itself is passed through untouched: no retry,
//! no buffering.

use crate::descriptor::OperationDescriptor;
use crate::error::{EsError, Result};
use crate::metrics::{record_slow_request, OperationTimer};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Log target shared by every facade log line.
pub const LOG_TARGET: &str = "es";

pub struct Interceptor {
    transport: Arc<dyn Transport>,
    slow_threshold: Duration,
}

impl Interceptor {
    pub fn new(transport: Arc<dyn Transport>, slow_threshold: Duration) -> Self {
        Self {
            transport,
            slow_threshold,
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    /// Send `descriptor` and log its completion.
    ///
    /// On success the timer is handed back unconsumed so the caller records
    /// the outcome once decoding is done.
    async fn send(&self, descriptor: &OperationDescriptor) -> Result<(Value, OperationTimer)> {
        let kind = descriptor.kind();
        let timer = OperationTimer::new(kind);

        match self.transport.send(descriptor).await {
            Ok(response) => {
                let elapsed = timer.elapsed();
                let duration_ms = elapsed.as_millis() as u64;
                if elapsed > self.slow_threshold {
                    record_slow_request(kind);
                    warn!(
                        target: LOG_TARGET,
                        kind = kind.as_str(),
                        targets = %descriptor.target(),
                        duration_ms,
                        "Slow ES {} ({}ms)",
                        descriptor.describe(),
                        duration_ms
                    );
                } else {
                    debug!(
                        target: LOG_TARGET,
                        kind = kind.as_str(),
                        targets = %descriptor.target(),
                        duration_ms,
                        "ES {} ({}ms)",
                        descriptor.describe(),
                        duration_ms
                    );
                }
                Ok((response, timer))
            }
            Err(e) => {
                let err = EsError::from_transport(
                    format!("Fail to execute ES {}", descriptor.describe()),
                    e,
                );
                let elapsed = timer.error(err.error_type());
                log_failure(descriptor, &err, elapsed);
                Err(err)
            }
        }
    }

    /// Execute `descriptor` and return the engine's raw response.
    pub async fn execute_raw(&self, descriptor: &OperationDescriptor) -> Result<Value> {
        let (response, timer) = self.send(descriptor).await?;
        timer.success();
        Ok(response)
    }

    /// Execute `descriptor` and decode the response into `R`.
    ///
    /// A response that does not match `R` is a Serialization failure, logged
    /// and counted like any other failure.
    pub async fn execute<R: DeserializeOwned>(&self, descriptor: &OperationDescriptor) -> Result<R> {
        let (raw, timer) = self.send(descriptor).await?;
        match serde_json::from_value(raw) {
            Ok(response) => {
                timer.success();
                Ok(response)
            }
            Err(e) => {
                let err = EsError::serialization(
                    format!("Fail to decode response of ES {}", descriptor.describe()),
                    e,
                );
                let elapsed = timer.error(err.error_type());
                log_failure(descriptor, &err, elapsed);
                Err(err)
            }
        }
    }
}

fn log_failure(descriptor: &OperationDescriptor, err: &EsError, elapsed: Duration) {
    let cause = std::error::Error::source(err)
        .map(|source| source.to_string())
        .unwrap_or_default();
    error!(
        target: LOG_TARGET,
        kind = descriptor.kind().as_str(),
        targets = %descriptor.target(),
        duration_ms = elapsed.as_millis() as u64,
        error_kind = err.kind().as_str(),
        cause = %cause,
        "{}",
        err
    );
}
