//! Error type shared by configuration and bank operations.
//!
//! Every variant except `IncompatibleBanks` is raised while building a
//! configuration; once built, ingesting, estimating and running trials
//! cannot fail.

/// Errors raised by `cardinality-trials`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("precision must be in [{min}, {max}] range, got {0}", min = crate::MIN_PRECISION, max = crate::MAX_PRECISION)]
    InvalidPrecision(u8),
    #[error("compact register width must be in [{min}, {max}] range, got {0}", min = crate::MIN_COMPACT_WIDTH, max = crate::MAX_COMPACT_WIDTH)]
    InvalidRegisterWidth(u8),
    #[error("unknown estimator variant '{0}'")]
    UnknownVariant(String),
    #[error("at least one estimator variant must be configured")]
    NoVariants,
    #[error("checkpoint step size must be positive")]
    ZeroStepSize,
    #[error("number of trials must be positive")]
    ZeroTrials,
    #[error("failed to build trial thread pool: {0}")]
    ThreadPool(String),
    #[error("cannot merge register banks: {0}")]
    IncompatibleBanks(String),
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
