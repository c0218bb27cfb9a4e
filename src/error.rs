use thiserror::Error;

/// Startup-fatal errors. Per-tick, per-PID, and per-region failures never
/// reach this type -- they are absorbed at the call site as `None`/zero
/// contributions (see `proc`, `scoring`) so that one bad reading never
/// aborts a sweep.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unrecoverable: {0}")]
    Unrecoverable(String),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
