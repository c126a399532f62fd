use std::time::Duration;

use super::config::{RampProfile, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSnapshot {
    pub index: usize,
    pub count: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

/// Piecewise-linear concurrency schedule. The ramp starts from zero at `elapsed == 0`
/// and each stage moves linearly from the previous stage's target to its own.
///
/// Immutable once built; every method is a pure function of `elapsed`.
#[derive(Debug, Clone)]
pub struct RampSchedule {
    stages: Vec<Stage>,
    cumulative_ends: Vec<Duration>,
}

impl RampSchedule {
    pub fn new(profile: &RampProfile) -> Self {
        let stages = profile.stages().to_vec();
        let mut cumulative_ends = Vec::with_capacity(stages.len());
        let mut acc = Duration::ZERO;
        for s in &stages {
            acc = acc.saturating_add(s.duration);
            cumulative_ends.push(acc);
        }

        Self {
            stages,
            cumulative_ends,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.cumulative_ends
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Target concurrency at `elapsed`, rounded to the nearest integer (ties round up).
    pub fn concurrency_at(&self, elapsed: Duration) -> u64 {
        let Some(last) = self.stages.last() else {
            return 0;
        };

        if elapsed >= self.total_duration() {
            return last.target;
        }

        let idx = self.stage_index(elapsed);
        let (stage_start, stage_end) = self.stage_bounds(idx);
        let stage_duration = stage_end.saturating_sub(stage_start);
        let stage_elapsed = elapsed.saturating_sub(stage_start);

        let start_target = self.start_target(idx);
        let end_target = self.stages[idx].target;

        if stage_duration.is_zero() {
            return end_target;
        }

        let start_i = start_target as i128;
        let delta = end_target as i128 - start_i;
        let num = stage_elapsed.as_nanos() as i128;
        let den = (stage_duration.as_nanos() as i128).max(1);

        // value * den, always non-negative because the value lies between two targets.
        let scaled = start_i
            .saturating_mul(den)
            .saturating_add(delta.saturating_mul(num));
        let rounded = scaled.saturating_mul(2).saturating_add(den) / den.saturating_mul(2);
        rounded.clamp(0, u64::MAX as i128) as u64
    }

    pub fn stage_snapshot_at(&self, elapsed: Duration) -> Option<StageSnapshot> {
        if self.stages.is_empty() {
            return None;
        }

        let total = self.total_duration();
        let clamped = elapsed.min(total);

        let idx = if clamped >= total {
            self.stages.len().saturating_sub(1)
        } else {
            self.stage_index(clamped)
        };

        let (stage_start, stage_end) = self.stage_bounds(idx);
        let stage_duration = stage_end.saturating_sub(stage_start);
        let stage_elapsed = clamped.saturating_sub(stage_start);
        let stage_remaining = stage_duration.saturating_sub(stage_elapsed);

        Some(StageSnapshot {
            index: idx,
            count: self.stages.len(),
            stage_elapsed,
            stage_remaining,
            start_target: self.start_target(idx),
            end_target: self.stages[idx].target,
            current_target: self.concurrency_at(clamped),
        })
    }

    // Index of the stage whose (start, end] window holds `elapsed`; a boundary belongs
    // to the stage it ends so the boundary value is that stage's target.
    fn stage_index(&self, elapsed: Duration) -> usize {
        match self
            .cumulative_ends
            .binary_search_by(|end| end.cmp(&elapsed))
        {
            Ok(i) | Err(i) => i.min(self.stages.len().saturating_sub(1)),
        }
    }

    fn stage_bounds(&self, idx: usize) -> (Duration, Duration) {
        let end = self.cumulative_ends[idx];
        let start = if idx == 0 {
            Duration::ZERO
        } else {
            self.cumulative_ends[idx - 1]
        };
        (start, end)
    }

    fn start_target(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            self.stages[idx - 1].target
        }
    }
}
