use rampr_core::{Report, TerminalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more iterations failed (check, status, timeout or connection).
    IterationsFailed = 10,

    /// The run was cancelled (Ctrl-C) before the ramp completed.
    Cancelled = 20,

    /// Invalid CLI/config/options (bad flags, invalid durations, missing url, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, fatal pool failures, engine task failures).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_report(report: &Report) -> Self {
        match report.terminal_state {
            TerminalState::Cancelled => Self::Cancelled,
            TerminalState::Finished if report.has_failures() => Self::IterationsFailed,
            TerminalState::Finished => Self::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampr_core::AggregateStats;
    use std::time::Duration;

    fn report(terminal_state: TerminalState, failure_count: u64) -> Report {
        Report {
            stats: AggregateStats {
                count: failure_count + 1,
                success_count: 1,
                failure_count,
                ..AggregateStats::default()
            },
            total_elapsed: Duration::from_secs(1),
            terminal_state,
            error: None,
        }
    }

    #[test]
    fn exit_code_follows_report() {
        assert_eq!(
            ExitCode::from_report(&report(TerminalState::Finished, 0)),
            ExitCode::Success
        );
        assert_eq!(
            ExitCode::from_report(&report(TerminalState::Finished, 3)),
            ExitCode::IterationsFailed
        );
        assert_eq!(
            ExitCode::from_report(&report(TerminalState::Cancelled, 3)),
            ExitCode::Cancelled
        );
    }
}
