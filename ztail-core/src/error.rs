//! Error types for the streaming pipeline.
//!
//! Window admission failures (a line too large for the capacity or budget)
//! are not errors: capacity is a hard ceiling and oversize lines are
//! silently dropped. Only source and sink I/O failures surface here.

use thiserror::Error;

/// Fatal errors escaping [`crate::StreamingPipeline::run`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source reader (file, stdin, or decompressor) failed mid-stream.
    #[error("source read failed: {0}")]
    Source(#[from] std::io::Error),

    /// Writing the final window contents to the output sink failed.
    #[error("emitting window contents failed: {0}")]
    Emit(std::io::Error),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
