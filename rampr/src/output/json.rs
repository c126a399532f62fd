use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _config: &rampr_core::EngineConfig) {}

    fn progress(&self) -> Option<rampr_core::ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, report: &rampr_core::Report) -> anyhow::Result<()> {
        let line = build_summary_line(report);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub state: String,
    pub elapsed_secs: f64,
    pub total_duration_secs: f64,
    pub target: u64,
    pub active_vus: usize,
    pub retiring_vus: usize,
    pub stage: Option<usize>,
    pub stages: Option<usize>,
    pub iterations_total: u64,
    pub failures_total: u64,
}

fn build_progress_line(u: &rampr_core::ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        state: u.state.to_string(),
        elapsed_secs: u.elapsed.as_secs_f64(),
        total_duration_secs: u.total_duration.as_secs_f64(),
        target: u.target,
        active_vus: u.active_vus,
        retiring_vus: u.retiring_vus,
        stage: u.stage.as_ref().map(|s| s.stage),
        stages: u.stage.as_ref().map(|s| s.stages),
        iterations_total: u.stats.count,
        failures_total: u.stats.failure_count,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub state: String,
    pub total_elapsed_secs: f64,
    pub iterations_total: u64,
    pub success_total: u64,
    pub failures_total: u64,
    pub iterations_per_sec: f64,
    pub errors_by_kind: BTreeMap<String, u64>,
    pub status_counts: BTreeMap<String, u64>,
    pub check: JsonCheck,
    pub latency: JsonLatencySummary,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonCheck {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Milliseconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

fn ms(d: Option<Duration>) -> Option<f64> {
    d.map(|d| d.as_secs_f64() * 1_000.0)
}

fn build_summary_line(report: &rampr_core::Report) -> JsonSummaryLine {
    let s = &report.stats;

    JsonSummaryLine {
        kind: "summary",
        state: report.terminal_state.to_string(),
        total_elapsed_secs: report.total_elapsed.as_secs_f64(),
        iterations_total: s.count,
        success_total: s.success_count,
        failures_total: s.failure_count,
        iterations_per_sec: report.iterations_per_sec(),
        errors_by_kind: s
            .errors_by_kind
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
        status_counts: s
            .status_counts
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
        check: JsonCheck {
            name: s.check.name.clone(),
            passes: s.check.passes,
            fails: s.check.fails,
        },
        latency: JsonLatencySummary {
            p50: ms(s.latency.p50),
            p90: ms(s.latency.p90),
            p95: ms(s.latency.p95),
            p99: ms(s.latency.p99),
            min: ms(s.min_duration),
            max: ms(s.max_duration),
            mean: ms(s.mean_duration()),
        },
        error: report.error.clone(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
