//! Error type shared by decomposition, configuration and the worker handoff.

/// Errors raised while building explosion systems, loading configuration or
/// driving the update worker.
#[derive(Debug)]
pub enum DebrisError {
    /// Settings asked for zero fragments.
    ZeroFragmentCount,
    /// Settings asked for more fragments than one system may hold.
    TooManyFragments { count: usize, max: usize },
    /// A position, energy or gravity modifier is NaN or infinite.
    NonFiniteSettings(&'static str),
    /// Minimum fragment extent is larger than the maximum.
    InvalidSizeRange { min: u32, max: u32 },
    /// The source block carries no texture atlas region.
    MissingAtlas,
    /// `start` was called while a job is still in flight.
    WorkerBusy,
    /// `join` was called with no job in flight.
    WorkerIdle,
    /// The worker thread is gone (channel closed).
    WorkerDisconnected,
    /// Standard I/O error.
    Io(std::io::Error),
    /// JSON serialization/deserialization error.
    Json(serde_json::Error),
}

impl std::fmt::Display for DebrisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebrisError::ZeroFragmentCount => write!(f, "explosion needs at least one fragment"),
            DebrisError::TooManyFragments { count, max } => {
                write!(f, "explosion asked for {count} fragments, the limit is {max}")
            }
            DebrisError::NonFiniteSettings(field) => write!(f, "explosion setting `{field}` is not finite"),
            DebrisError::InvalidSizeRange { min, max } => {
                write!(f, "fragment size range is inverted: min {min} > max {max}")
            }
            DebrisError::MissingAtlas => write!(f, "source block has no texture atlas region"),
            DebrisError::WorkerBusy => write!(f, "worker already has a job in flight"),
            DebrisError::WorkerIdle => write!(f, "worker has no job to join"),
            DebrisError::WorkerDisconnected => write!(f, "worker thread disconnected"),
            DebrisError::Io(e) => write!(f, "IO error: {e}"),
            DebrisError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for DebrisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DebrisError::Io(e) => Some(e),
            DebrisError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DebrisError {
    fn from(e: std::io::Error) -> Self {
        DebrisError::Io(e)
    }
}

impl From<serde_json::Error> for DebrisError {
    fn from(e: serde_json::Error) -> Self {
        DebrisError::Json(e)
    }
}
