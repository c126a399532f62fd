use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rampr_http::HttpRequest;

use super::check::{Check, StatusCheck};
use super::error::{Error, Result};

pub const DEFAULT_PACING: Duration = Duration::from_secs(1);
pub const DEFAULT_ITERATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_VUS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    pub fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// Ordered ramp stages. Playback order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RampProfile {
    stages: Vec<Stage>,
}

impl RampProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |acc, s| acc.saturating_add(s.duration))
    }

    pub fn validate(&self) -> Result<()> {
        match self.stages.iter().position(|s| s.duration.is_zero()) {
            Some(index) => Err(Error::InvalidStage { index }),
            None => Ok(()),
        }
    }
}

impl FromIterator<Stage> for RampProfile {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// What every virtual user does once per iteration.
#[derive(Clone)]
pub struct WorkloadConfig {
    pub request: HttpRequest,
    pub check: Arc<dyn Check>,
    /// Fixed wait after each iteration's check.
    pub pacing: Duration,
    /// Hard cap on the request + check phase of one iteration.
    pub iteration_timeout: Duration,
}

impl WorkloadConfig {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            check: Arc::new(StatusCheck::ok()),
            pacing: DEFAULT_PACING,
            iteration_timeout: DEFAULT_ITERATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.check = Arc::new(check);
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_iteration_timeout(mut self, timeout: Duration) -> Self {
        self.iteration_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        rampr_http::validate_url(&self.request.url)?;
        rampr_http::validate_headers(&self.request.headers)?;
        if self.iteration_timeout.is_zero() {
            return Err(Error::InvalidIterationTimeout);
        }
        Ok(())
    }
}

impl fmt::Debug for WorkloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadConfig")
            .field("request", &self.request)
            .field("check", &self.check.name())
            .field("pacing", &self.pacing)
            .field("iteration_timeout", &self.iteration_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub profile: RampProfile,
    pub workload: WorkloadConfig,
    /// Logical clock resolution of the engine's tick loop.
    pub tick: Duration,
    /// Upper bound on running virtual users. Workers that are finishing their
    /// last iteration after a shrink do not count against it.
    pub max_vus: u64,
}

impl EngineConfig {
    pub fn new(profile: RampProfile, workload: WorkloadConfig) -> Self {
        Self {
            profile,
            workload,
            tick: DEFAULT_TICK,
            max_vus: DEFAULT_MAX_VUS,
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn with_max_vus(mut self, max_vus: u64) -> Self {
        self.max_vus = max_vus;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        self.workload.validate()?;
        if self.tick.is_zero() {
            return Err(Error::InvalidTick);
        }
        if self.max_vus == 0 {
            return Err(Error::InvalidMaxVus);
        }
        Ok(())
    }
}
