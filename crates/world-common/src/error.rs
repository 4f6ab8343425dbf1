//! Error types for map decoding, encoding and rendering.

use thiserror::Error;

/// Result type alias using WorldError.
pub type WorldResult<T> = Result<T, WorldError>;

/// Primary error type for world map operations.
///
/// Every variant is fatal to the operation that produced it. Nothing in the
/// workspace retries internally; callers re-invoke the whole decode, encode or
/// render if they want a retry.
#[derive(Debug, Error)]
pub enum WorldError {
    // === Container Errors ===
    #[error("Corrupt chunk stream: {0}")]
    StreamCorrupt(String),

    #[error("Truncated chunk stream: expected {expected} bytes, {available} available")]
    TruncatedStream { expected: usize, available: usize },

    #[error("Chunks with multiple passes are not supported (pass count {0})")]
    UnsupportedPassCount(u64),

    #[error("Invalid world schema: {0}")]
    Schema(String),

    // === Raster Errors ===
    #[error("Invalid raster shape: {0}")]
    InvalidRasterShape(String),

    #[error("Map not found: {0}")]
    UnknownMap(String),

    // === Rendering Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker pool has been terminated")]
    PoolTerminated,

    #[error("Tile job {index} failed: {reason}")]
    JobFailed { index: usize, reason: JobError },

    #[error("Rendering failed: {0}")]
    Render(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorldError {
    /// Create a StreamCorrupt error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::StreamCorrupt(msg.into())
    }

    /// Create an InvalidRasterShape error.
    pub fn raster_shape(msg: impl Into<String>) -> Self {
        Self::InvalidRasterShape(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error means the input bytes are damaged, as opposed to a
    /// caller or environment problem.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            WorldError::StreamCorrupt(_)
                | WorldError::TruncatedStream { .. }
                | WorldError::UnsupportedPassCount(_)
                | WorldError::Schema(_)
        )
    }
}

/// Failure of a single job inside a worker pool.
///
/// Delivered to the job's completion callback rather than raised, so the
/// submitter decides whether the whole operation aborts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("handler returned an error: {0}")]
    Failed(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("pool terminated before the job was dispatched")]
    Terminated,

    #[error("job cancelled before it was dispatched")]
    Cancelled,

    #[error("worker {0} is no longer accepting jobs")]
    WorkerLost(usize),
}
