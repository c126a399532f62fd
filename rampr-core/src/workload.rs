use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rampr_http::HttpRequest;
use tokio::time::Instant;

use super::check::Check;
use super::config::WorkloadConfig;
use super::outcome::{ErrorKind, IterationOutcome};
use super::transport::{Transport, TransportErrorKind};

/// Executes one iteration of the workload body: request, check, pacing.
pub struct WorkloadRunner<T> {
    transport: Arc<T>,
    request: HttpRequest,
    check: Arc<dyn Check>,
    pacing: Duration,
    iteration_timeout: Duration,
    epoch: Instant,
}

impl<T: Transport> WorkloadRunner<T> {
    pub fn new(transport: Arc<T>, workload: &WorkloadConfig, epoch: Instant) -> Self {
        Self {
            transport,
            request: workload.request.clone(),
            check: workload.check.clone(),
            pacing: workload.pacing,
            iteration_timeout: workload.iteration_timeout,
            epoch,
        }
    }

    /// Runs one full iteration. The pacing wait is cut short when `stop` resolves; the
    /// request itself is never interrupted by `stop`, only by the iteration timeout.
    pub async fn run_iteration<S>(&self, user_id: u64, stop: S) -> IterationOutcome
    where
        S: Future<Output = ()>,
    {
        let outcome = self.execute(user_id).await;
        self.pace(stop).await;
        outcome
    }

    /// Request + check, bounded by the iteration timeout.
    pub async fn execute(&self, user_id: u64) -> IterationOutcome {
        let started = Instant::now();
        let start_time = started.saturating_duration_since(self.epoch);

        // Dropping the send future on timeout cancels the in-flight request.
        let res = tokio::time::timeout(self.iteration_timeout, self.transport.send(&self.request))
            .await;
        let duration = started.elapsed();

        match res {
            Err(_) => IterationOutcome::failed(
                user_id,
                start_time,
                duration,
                ErrorKind::Timeout,
                None,
            ),
            Ok(Err(err)) => {
                let kind = match err.kind {
                    TransportErrorKind::Timeout => ErrorKind::Timeout,
                    TransportErrorKind::Connection => ErrorKind::ConnectionError,
                };
                IterationOutcome::failed(user_id, start_time, duration, kind, None)
            }
            Ok(Ok(response)) => {
                if self.check.check(&response) {
                    IterationOutcome::passed(user_id, start_time, duration, response.status)
                } else {
                    IterationOutcome::failed(
                        user_id,
                        start_time,
                        duration,
                        self.check.failure_kind(),
                        Some(response.status),
                    )
                }
            }
        }
    }

    async fn pace<S>(&self, stop: S)
    where
        S: Future<Output = ()>,
    {
        if self.pacing.is_zero() {
            tokio::task::yield_now().await;
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.pacing) => {}
            _ = stop => {}
        }
    }
}
