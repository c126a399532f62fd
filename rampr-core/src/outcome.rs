use std::time::Duration;

/// Why an iteration failed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The check predicate returned false.
    CheckFailure,
    /// The request did not finish within the iteration timeout.
    Timeout,
    /// The request never produced a response (connect, reset, protocol errors).
    ConnectionError,
    /// A status check rejected the response status.
    UnexpectedStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    pub user_id: u64,
    /// Offset from the run epoch at which the iteration started.
    pub start_time: Duration,
    /// Request + check time; pacing is not included.
    pub duration: Duration,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    /// Response status, when a response was received.
    pub status: Option<u16>,
}

impl IterationOutcome {
    pub fn passed(user_id: u64, start_time: Duration, duration: Duration, status: u16) -> Self {
        Self {
            user_id,
            start_time,
            duration,
            success: true,
            error_kind: None,
            status: Some(status),
        }
    }

    pub fn failed(
        user_id: u64,
        start_time: Duration,
        duration: Duration,
        kind: ErrorKind,
        status: Option<u16>,
    ) -> Self {
        Self {
            user_id,
            start_time,
            duration,
            success: false,
            error_kind: Some(kind),
            status,
        }
    }
}
