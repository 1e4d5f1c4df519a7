use thiserror::Error;

/// Rejected session parameters. Raised at construction, never patched over
/// with defaults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worm length must be at least 1")]
    EmptyWorm,
    #[error("initial direction ({0}, {1}) is not a single axis-aligned cell step")]
    InvalidDirection(i32, i32),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("no free cell found for food after {attempts} attempts")]
    NoFreeCell { attempts: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
