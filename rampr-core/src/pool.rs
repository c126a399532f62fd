use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::aggregate::Aggregator;
use super::error::{Error, Result};
use super::transport::Transport;
use super::vu::VuControl;
use super::workload::WorkloadRunner;

#[derive(Debug)]
struct Worker {
    control: Arc<VuControl>,
    task: JoinHandle<()>,
}

/// Virtual users of one run. Only the engine's driver task calls into the pool, so
/// resizes are serialized; they only race with iterations already in flight.
pub struct VirtualUserPool<T> {
    runner: Arc<WorkloadRunner<T>>,
    aggregator: Arc<Aggregator>,
    /// Running workers in spawn order; shrinking retires from the back.
    running: Vec<Worker>,
    /// Stopping workers finishing their in-flight iteration.
    retiring: Vec<Worker>,
    next_id: u64,
    capacity: u64,
}

impl<T: Transport> VirtualUserPool<T> {
    pub fn new(
        runner: Arc<WorkloadRunner<T>>,
        aggregator: Arc<Aggregator>,
        capacity: u64,
    ) -> Self {
        Self {
            runner,
            aggregator,
            running: Vec::new(),
            retiring: Vec::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Number of Running virtual users.
    pub fn active(&self) -> usize {
        self.running.len()
    }

    /// Number of Stopping virtual users that have not finished yet.
    pub fn retiring(&mut self) -> usize {
        self.reap();
        self.retiring.len()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Ids of the Running virtual users, oldest first.
    pub fn active_ids(&self) -> Vec<u64> {
        self.running.iter().map(|w| w.control.id()).collect()
    }

    /// Grow or shrink to exactly `target` Running virtual users.
    ///
    /// Shrinking marks the most recently spawned workers Stopping; each finishes its
    /// in-flight iteration and never starts another.
    pub fn resize(&mut self, target: u64) -> Result<()> {
        self.reap();

        let current = self.running.len() as u64;
        if target == current {
            return Ok(());
        }

        if target > current {
            for _ in current..target {
                self.spawn_one()?;
            }
        } else {
            let keep = usize::try_from(target).unwrap_or(usize::MAX);
            let retired: Vec<Worker> = self.running.drain(keep..).rev().collect();
            for w in &retired {
                w.control.request_stop();
            }
            self.retiring.extend(retired);
        }

        debug!(
            from = current,
            to = target,
            retiring = self.retiring.len(),
            "resized virtual user pool"
        );
        Ok(())
    }

    /// Mark every worker Stopping. The returned [`Drain`] resolves once all of them
    /// have reached Stopped.
    pub fn stop_all(&mut self) -> Drain {
        let mut workers: Vec<Worker> = self.running.drain(..).rev().collect();
        workers.append(&mut self.retiring);
        for w in &workers {
            w.control.request_stop();
        }
        Drain { workers }
    }

    fn spawn_one(&mut self) -> Result<()> {
        let vu_id = self.next_id;

        if self.running.len() as u64 >= self.capacity {
            return Err(Error::PoolSpawn {
                vu_id,
                reason: format!("pool capacity of {} virtual users reached", self.capacity),
            });
        }

        let handle = tokio::runtime::Handle::try_current().map_err(|err| Error::PoolSpawn {
            vu_id,
            reason: err.to_string(),
        })?;

        let control = Arc::new(VuControl::new(vu_id));
        if !control.mark_running() {
            return Err(Error::PoolSpawn {
                vu_id,
                reason: "virtual user was stopped before it started".to_string(),
            });
        }

        let task = handle.spawn(vu_loop(
            control.clone(),
            self.runner.clone(),
            self.aggregator.clone(),
        ));

        self.next_id = self.next_id.saturating_add(1);
        self.running.push(Worker { control, task });
        Ok(())
    }

    fn reap(&mut self) {
        self.retiring.retain(|w| !w.task.is_finished());
    }
}

impl<T> Drop for VirtualUserPool<T> {
    fn drop(&mut self) {
        for w in self.running.iter().chain(self.retiring.iter()) {
            w.control.request_stop();
        }
    }
}

async fn vu_loop<T: Transport>(
    control: Arc<VuControl>,
    runner: Arc<WorkloadRunner<T>>,
    aggregator: Arc<Aggregator>,
) {
    while control.is_running() {
        let outcome = runner
            .run_iteration(control.id(), control.stop_requested())
            .await;
        aggregator.record(&outcome);
    }
    control.mark_stopped();
}

/// Completion signal for [`VirtualUserPool::stop_all`].
#[must_use = "a drain does nothing unless awaited"]
#[derive(Debug)]
pub struct Drain {
    workers: Vec<Worker>,
}

impl Drain {
    /// Wait until every worker has stopped. Returns how many were drained.
    pub async fn wait(self) -> usize {
        let n = self.workers.len();
        for w in self.workers {
            let vu_id = w.control.id();
            if let Err(err) = w.task.await {
                warn!(vu_id, error = %err, "virtual user task ended abnormally");
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::transport::TransportError;
    use crate::vu::VuState;
    use rampr_http::{HttpRequest, HttpResponse};
    use std::future::Future;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Default)]
    struct CountingTransport {
        calls: AtomicU64,
    }

    impl Transport for CountingTransport {
        fn send(
            &self,
            _request: &HttpRequest,
        ) -> impl Future<Output = std::result::Result<HttpResponse, TransportError>> + Send
        {
            self.calls.fetch_add(1, Ordering::Relaxed);
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(HttpResponse {
                    status: 200,
                    body: Default::default(),
                    headers: Vec::new(),
                })
            }
        }
    }

    fn pool(
        capacity: u64,
    ) -> (
        VirtualUserPool<CountingTransport>,
        Arc<CountingTransport>,
        Arc<Aggregator>,
    ) {
        let transport = Arc::new(CountingTransport::default());
        let workload = WorkloadConfig::new(HttpRequest::get("http://127.0.0.1:1/"))
            .with_pacing(Duration::from_millis(400));
        let runner = Arc::new(WorkloadRunner::new(transport.clone(), &workload, Instant::now()));
        let aggregator = Arc::new(Aggregator::default());
        (
            VirtualUserPool::new(runner, aggregator.clone(), capacity),
            transport,
            aggregator,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn grows_and_shrinks_from_the_back() -> anyhow::Result<()> {
        let (mut pool, _transport, _agg) = pool(100);

        pool.resize(5)?;
        assert_eq!(pool.active(), 5);
        assert_eq!(pool.active_ids(), vec![1, 2, 3, 4, 5]);

        pool.resize(2)?;
        assert_eq!(pool.active(), 2);
        assert_eq!(pool.active_ids(), vec![1, 2]);

        pool.resize(4)?;
        assert_eq!(pool.active_ids(), vec![1, 2, 6, 7]);

        let drained = pool.stop_all().wait().await;
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.retiring(), 0);
        assert!(drained >= 4);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn retired_workers_finish_in_flight_iteration_then_stop() -> anyhow::Result<()> {
        let (mut pool, transport, agg) = pool(100);

        pool.resize(3)?;
        // Let every worker enter its first request.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.calls.load(Ordering::Relaxed), 3);

        pool.resize(0)?;
        assert_eq!(pool.active(), 0);

        let retired: Vec<Arc<VuControl>> =
            pool.retiring.iter().map(|w| w.control.clone()).collect();
        assert_eq!(retired.len(), 3);
        assert!(retired.iter().all(|c| c.state() == VuState::Stopping));

        pool.stop_all().wait().await;

        assert!(retired.iter().all(|c| c.state() == VuState::Stopped));
        // The in-flight requests completed and were recorded; nothing new started.
        assert_eq!(transport.calls.load(Ordering::Relaxed), 3);
        assert_eq!(agg.snapshot().count, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_overflow_is_a_spawn_failure() -> anyhow::Result<()> {
        let (mut pool, _transport, _agg) = pool(2);

        match pool.resize(3) {
            Err(Error::PoolSpawn { vu_id, .. }) => assert_eq!(vu_id, 3),
            other => anyhow::bail!("expected spawn failure, got {other:?}"),
        }
        assert_eq!(pool.active(), 2);

        pool.stop_all().wait().await;
        Ok(())
    }

    #[test]
    fn spawning_outside_a_runtime_fails() {
        let (mut pool, _transport, _agg) = pool(10);
        assert!(matches!(pool.resize(1), Err(Error::PoolSpawn { vu_id: 1, .. })));
        assert_eq!(pool.active(), 0);
    }
}
