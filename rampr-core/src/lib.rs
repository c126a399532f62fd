#![forbid(unsafe_code)]

mod aggregate;
mod check;
mod config;
mod engine;
mod error;
mod outcome;
mod pool;
mod progress;
mod schedule;
mod transport;
mod vu;
mod workload;

pub use aggregate::{AggregateStats, Aggregator, CheckTally, LatencySummary};
pub use check::{Check, FnCheck, StatusCheck};
pub use config::{
    DEFAULT_ITERATION_TIMEOUT, DEFAULT_MAX_VUS, DEFAULT_PACING, DEFAULT_TICK, EngineConfig,
    RampProfile, Stage, WorkloadConfig,
};
pub use engine::{CancelHandle, Engine, EngineState, Report, RunHandle, TerminalState};
pub use error::{Error, Result};
pub use outcome::{ErrorKind, IterationOutcome};
pub use pool::{Drain, VirtualUserPool};
pub use progress::{ProgressFn, ProgressUpdate, StageProgress};
pub use schedule::{RampSchedule, StageSnapshot};
pub use transport::{Transport, TransportError, TransportErrorKind};
pub use vu::VuState;
pub use workload::WorkloadRunner;

pub use rampr_http::{HttpClient, HttpRequest, HttpResponse, Method};
