use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use super::outcome::{ErrorKind, IterationOutcome};

/// Latency percentiles over every recorded iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub p50: Option<Duration>,
    pub p90: Option<Duration>,
    pub p95: Option<Duration>,
    pub p99: Option<Duration>,
}

/// Pass/fail counts of the workload's named check. Iterations that never got a
/// response are not counted here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckTally {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub min_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    pub sum_duration: Duration,
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,
    pub status_counts: BTreeMap<u16, u64>,
    pub check: CheckTally,
    pub latency: LatencySummary,
}

impl AggregateStats {
    pub fn mean_duration(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let nanos = self.sum_duration.as_nanos() / u128::from(self.count);
        Some(Duration::from_nanos(nanos.min(u128::from(u64::MAX)) as u64))
    }

    /// Fraction of iterations that passed, in `0..=1`.
    pub fn success_rate(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.success_count as f64 / self.count as f64)
    }

    pub fn iterations_per_sec(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.count as f64 / secs
    }

    pub fn errors_of(&self, kind: ErrorKind) -> u64 {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug)]
struct Totals {
    stats: AggregateStats,
    latency_us: Histogram<u64>,
}

/// Streaming accumulator for iteration outcomes.
///
/// Every update is a sum, count, min, max or histogram increment, so totals do not
/// depend on the order in which workers report.
#[derive(Debug)]
pub struct Aggregator {
    inner: Mutex<Totals>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new("check")
    }
}

impl Aggregator {
    pub fn new(check_name: impl Into<String>) -> Self {
        // Track up to one hour in microseconds (with 3 sigfigs).
        let latency_us = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));

        let stats = AggregateStats {
            check: CheckTally {
                name: check_name.into(),
                ..CheckTally::default()
            },
            ..AggregateStats::default()
        };

        Self {
            inner: Mutex::new(Totals { stats, latency_us }),
        }
    }

    pub fn record(&self, outcome: &IterationOutcome) {
        let micros = (outcome.duration.as_micros().min(u128::from(u64::MAX)) as u64).max(1);

        let mut inner = self.inner.lock();
        let s = &mut inner.stats;

        s.count = s.count.saturating_add(1);
        if outcome.success {
            s.success_count = s.success_count.saturating_add(1);
        } else {
            s.failure_count = s.failure_count.saturating_add(1);
        }

        s.min_duration = Some(match s.min_duration {
            Some(cur) => cur.min(outcome.duration),
            None => outcome.duration,
        });
        s.max_duration = Some(match s.max_duration {
            Some(cur) => cur.max(outcome.duration),
            None => outcome.duration,
        });
        s.sum_duration = s.sum_duration.saturating_add(outcome.duration);

        if let Some(kind) = outcome.error_kind {
            *s.errors_by_kind.entry(kind).or_insert(0) += 1;
        }

        if let Some(status) = outcome.status {
            *s.status_counts.entry(status).or_insert(0) += 1;

            // A response was evaluated by the check.
            if outcome.success {
                s.check.passes = s.check.passes.saturating_add(1);
            } else {
                s.check.fails = s.check.fails.saturating_add(1);
            }
        }

        inner.latency_us.saturating_record(micros);
    }

    /// Point-in-time copy taken under the lock, so it never reflects a partial update.
    pub fn snapshot(&self) -> AggregateStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.latency = latency_summary(&inner.latency_us);
        stats
    }
}

fn latency_summary(h: &Histogram<u64>) -> LatencySummary {
    if h.is_empty() {
        return LatencySummary::default();
    }

    let at = |q: f64| Some(Duration::from_micros(h.value_at_quantile(q)));
    LatencySummary {
        p50: at(0.50),
        p90: at(0.90),
        p95: at(0.95),
        p99: at(0.99),
    }
}
