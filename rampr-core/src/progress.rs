use std::sync::Arc;
use std::time::Duration;

use super::aggregate::AggregateStats;
use super::engine::EngineState;
use super::schedule::StageSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProgress {
    /// 1-based stage index.
    pub stage: usize,
    pub stages: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

impl From<StageSnapshot> for StageProgress {
    fn from(st: StageSnapshot) -> Self {
        Self {
            stage: st.index + 1,
            stages: st.count,
            stage_elapsed: st.stage_elapsed,
            stage_remaining: st.stage_remaining,
            start_target: st.start_target,
            end_target: st.end_target,
            current_target: st.current_target,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based) for progress emissions.
    pub tick: u64,
    /// Logical time of the tick.
    pub elapsed: Duration,
    pub total_duration: Duration,
    pub state: EngineState,
    /// Concurrency the ramp asked for at `elapsed`.
    pub target: u64,
    pub active_vus: usize,
    /// Workers told to stop that are still finishing an iteration.
    pub retiring_vus: usize,
    pub stage: Option<StageProgress>,
    pub stats: AggregateStats,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
