pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] rampr_http::Error),

    #[error("stage {index} must have a positive duration")]
    InvalidStage { index: usize },

    #[error("`iteration_timeout` must be a positive duration")]
    InvalidIterationTimeout,

    #[error("`tick` must be a positive duration")]
    InvalidTick,

    #[error("`max_vus` must be a positive integer")]
    InvalidMaxVus,

    #[error("failed to spawn virtual user {vu_id}: {reason}")]
    PoolSpawn { vu_id: u64, reason: String },

    #[error("engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Configuration errors are reported before any worker starts; everything
    /// else happens mid-run.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::PoolSpawn { .. } | Self::Join(_))
    }
}
