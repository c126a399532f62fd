use std::fmt::Write as _;

use super::duration::{format_duration, format_duration_opt};
use super::format::{format_pct, format_rate};

pub(crate) fn render(report: &rampr_core::Report) -> String {
    let s = &report.stats;
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        &mut out,
        "  state: {} after {}",
        report.terminal_state,
        format_duration(report.total_elapsed)
    )
    .ok();
    writeln!(
        &mut out,
        "  iterations: {} (passed {}, failed {})",
        s.count, s.success_count, s.failure_count
    )
    .ok();
    writeln!(
        &mut out,
        "  rate: {} iters/s",
        format_rate(report.iterations_per_sec())
    )
    .ok();

    let evaluated = s.check.passes.saturating_add(s.check.fails);
    writeln!(
        &mut out,
        "  check \"{}\": {} passed, {} failed ({})",
        s.check.name,
        s.check.passes,
        s.check.fails,
        format_pct(s.check.passes, evaluated)
    )
    .ok();

    if !s.errors_by_kind.is_empty() {
        out.push_str("  errors:\n");
        for (kind, count) in &s.errors_by_kind {
            writeln!(&mut out, "    {kind}: {count}").ok();
        }
    }

    if !s.status_counts.is_empty() {
        out.push_str("  statuses:\n");
        for (status, count) in &s.status_counts {
            writeln!(&mut out, "    {status}: {count}").ok();
        }
    }

    if s.count == 0 {
        out.push_str("  latency: n/a\n");
    } else {
        writeln!(
            &mut out,
            "  latency: p50={} p90={} p95={} p99={} min={} mean={} max={}",
            format_duration_opt(s.latency.p50),
            format_duration_opt(s.latency.p90),
            format_duration_opt(s.latency.p95),
            format_duration_opt(s.latency.p99),
            format_duration_opt(s.min_duration),
            format_duration_opt(s.mean_duration()),
            format_duration_opt(s.max_duration),
        )
        .ok();
    }

    out
}
