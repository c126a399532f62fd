use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use super::aggregate::{AggregateStats, Aggregator};
use super::config::EngineConfig;
use super::error::Result;
use super::pool::VirtualUserPool;
use super::progress::{ProgressFn, ProgressUpdate, StageProgress};
use super::schedule::RampSchedule;
use super::transport::Transport;
use super::workload::WorkloadRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running,
    Draining,
    Finished,
    Cancelled,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TerminalState {
    Finished,
    Cancelled,
}

impl From<TerminalState> for EngineState {
    fn from(value: TerminalState) -> Self {
        match value {
            TerminalState::Finished => Self::Finished,
            TerminalState::Cancelled => Self::Cancelled,
        }
    }
}

/// Final result of a run. Always produced, including after cancellation or a fatal
/// pool failure; `error` carries the reason in the latter case.
#[derive(Debug, Clone)]
pub struct Report {
    pub stats: AggregateStats,
    pub total_elapsed: Duration,
    pub terminal_state: TerminalState,
    pub error: Option<String>,
}

impl Report {
    pub fn has_failures(&self) -> bool {
        self.stats.failure_count > 0
    }

    pub fn iterations_per_sec(&self) -> f64 {
        self.stats.iterations_per_sec(self.total_elapsed)
    }
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable external cancellation request for a run.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }

            notified.await;
        }
    }
}

/// Drives one ramp from start to report.
pub struct Engine<T> {
    config: EngineConfig,
    transport: Arc<T>,
    cancel: CancelHandle,
    state_tx: watch::Sender<EngineState>,
    progress: Option<ProgressFn>,
}

impl<T: Transport> Engine<T> {
    /// Validates the configuration; nothing is spawned until the engine runs.
    pub fn new(config: EngineConfig, transport: Arc<T>) -> Result<Self> {
        config.validate()?;
        let (state_tx, _) = watch::channel(EngineState::Idle);
        Ok(Self {
            config,
            transport,
            cancel: CancelHandle::new(),
            state_tx,
            progress: None,
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> EngineState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Run on a background task.
    pub fn start(self) -> RunHandle {
        let cancel = self.cancel.clone();
        let state_rx = self.subscribe();
        let task = tokio::spawn(self.run());
        RunHandle {
            cancel,
            state_rx,
            task,
        }
    }

    pub async fn run(self) -> Report {
        let Self {
            config,
            transport,
            cancel,
            state_tx,
            progress,
        } = self;

        let schedule = RampSchedule::new(&config.profile);
        let total_duration = schedule.total_duration();
        let tick = config.tick;

        let started = Instant::now();
        let aggregator = Arc::new(Aggregator::new(config.workload.check.name()));
        let runner = Arc::new(WorkloadRunner::new(transport, &config.workload, started));
        let mut pool = VirtualUserPool::new(runner, aggregator.clone(), config.max_vus);

        state_tx.send_replace(EngineState::Running);
        info!(
            stages = schedule.stages().len(),
            total_duration = ?total_duration,
            max_vus = config.max_vus,
            "run started"
        );

        let mut tick_id: u64 = 0;
        let mut emit = |pool: &mut VirtualUserPool<T>, state: EngineState, elapsed: Duration| {
            let Some(progress) = progress.as_ref() else {
                return;
            };
            tick_id = tick_id.saturating_add(1);
            (progress)(ProgressUpdate {
                tick: tick_id,
                elapsed,
                total_duration,
                state,
                target: if state == EngineState::Running {
                    schedule.concurrency_at(elapsed)
                } else {
                    0
                },
                active_vus: pool.active(),
                retiring_vus: pool.retiring(),
                stage: schedule.stage_snapshot_at(elapsed).map(StageProgress::from),
                stats: aggregator.snapshot(),
            });
        };

        let mut interval = tokio::time::interval_at(started, tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Logical time: advances by exactly one tick per loop turn.
        let mut elapsed = Duration::ZERO;
        let mut cancelled = false;
        let mut fatal: Option<String> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = interval.tick() => {}
            }

            if schedule.is_done(elapsed) {
                break;
            }

            let target = schedule.concurrency_at(elapsed);
            if let Err(err) = pool.resize(target) {
                error!(
                    error = %err,
                    elapsed = ?elapsed,
                    target,
                    "pool resize failed, cancelling run"
                );
                fatal = Some(err.to_string());
                cancelled = true;
                break;
            }

            emit(&mut pool, EngineState::Running, elapsed);
            elapsed = elapsed.saturating_add(tick);
        }

        if !cancelled {
            state_tx.send_replace(EngineState::Draining);
            info!(elapsed = ?elapsed, active_vus = pool.active(), "ramp complete, draining");

            if let Err(err) = pool.resize(0) {
                error!(error = %err, "failed to shrink pool");
            }
            let drain = pool.stop_all().wait();
            tokio::pin!(drain);

            cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = &mut drain => false,
            };
            if cancelled {
                // Workers are already stopping; in-flight iterations still get recorded.
                drain.await;
            }
        } else {
            pool.stop_all().wait().await;
        }

        let terminal_state = if cancelled {
            TerminalState::Cancelled
        } else {
            TerminalState::Finished
        };
        let total_elapsed = started.elapsed();

        state_tx.send_replace(terminal_state.into());
        emit(&mut pool, terminal_state.into(), elapsed);

        let stats = aggregator.snapshot();
        info!(
            state = %terminal_state,
            iterations = stats.count,
            failures = stats.failure_count,
            total_elapsed = ?total_elapsed,
            "run complete"
        );

        Report {
            stats,
            total_elapsed,
            terminal_state,
            error: fatal,
        }
    }
}

/// Handle to a run started with [`Engine::start`].
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelHandle,
    state_rx: watch::Receiver<EngineState>,
    task: JoinHandle<Report>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    pub async fn wait(self) -> Result<Report> {
        Ok(self.task.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn terminal_states() {
        assert!(!EngineState::Idle.is_terminal());
        assert!(!EngineState::Running.is_terminal());
        assert!(!EngineState::Draining.is_terminal());
        assert!(EngineState::Finished.is_terminal());
        assert!(EngineState::Cancelled.is_terminal());
        assert_eq!(EngineState::from(TerminalState::Cancelled), EngineState::Cancelled);
        assert_eq!(EngineState::Draining.to_string(), "draining");
    }

    #[tokio::test]
    async fn cancel_handle_wakes_waiters_once_cancelled() {
        let cancel = CancelHandle::new();
        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move { cancel.cancelled().await })
        };

        tokio::task::yield_now().await;
        assert!(!cancel.is_cancelled());
        cancel.cancel();
        cancel.cancel();

        let res = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(res, Ok(Ok(()))), "waiter was not woken: {res:?}");

        // Already cancelled: resolves immediately.
        cancel.cancelled().await;
    }
}
