use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

mod duration;
mod format;
mod progress;
mod summary;

use duration::format_duration;
use format::format_rate;
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, config: &rampr_core::EngineConfig) {
        let w = &config.workload;
        println!("target: {} {}", w.request.method, w.request.url);
        println!(
            "check: {} pacing={} iteration_timeout={}",
            w.check.name(),
            format_duration(w.pacing),
            format_duration(w.iteration_timeout)
        );
        for (i, s) in config.profile.stages().iter().enumerate() {
            println!(
                "stage {}: {} -> {} vus",
                i + 1,
                format_duration(s.duration),
                s.target
            );
        }
        println!();
    }

    fn progress(&self) -> Option<rampr_core::ProgressFn> {
        let progress = self.progress.clone();
        // (elapsed, iterations) at the previous update, for the instantaneous rate.
        let prev: Arc<Mutex<(Duration, u64)>> = Arc::new(Mutex::new((Duration::ZERO, 0)));

        Some(Arc::new(move |u| {
            if u.state.is_terminal() {
                progress.finish();
                return;
            }

            let iters_total = u.stats.count;
            let (prev_elapsed, prev_iters) = {
                let mut inner = prev.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let last = *inner;
                *inner = (u.elapsed, iters_total);
                last
            };

            let dt = u.elapsed.saturating_sub(prev_elapsed).as_secs_f64().max(1e-9);
            let iters_per_sec = (iters_total.saturating_sub(prev_iters) as f64) / dt;

            let mut message = match &u.stage {
                Some(stage) => format!(
                    "stage={}/{} target={} vus={}",
                    stage.stage, stage.stages, u.target, u.active_vus
                ),
                None => format!("target={} vus={}", u.target, u.active_vus),
            };
            if u.retiring_vus > 0 {
                message.push_str(&format!(" (+{} stopping)", u.retiring_vus));
            }
            message.push_str(&format!(
                " iters={iters_total} iters/s={} failed={}",
                format_rate(iters_per_sec),
                u.stats.failure_count
            ));

            progress.update(u.total_duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, report: &rampr_core::Report) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(report));
        Ok(())
    }
}
